pub mod bridges;
pub mod conversation_screen;
pub mod reading_screen;
pub mod user_facing;
