pub mod capture;
pub mod playback;
pub mod resample;
pub mod wav;

pub use capture::{AudioCaptureError, CaptureController, RecordedClip};
pub use playback::{AudioSlot, PlaybackController};
