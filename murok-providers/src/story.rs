use crate::request::{Body, HttpRequest, bearer_header, join_url};
use murok_core::types::StoryId;

fn get(url: String, token: &str) -> HttpRequest {
    HttpRequest {
        method: "GET".into(),
        url,
        headers: vec![
            ("Accept".into(), "application/json".into()),
            bearer_header(token),
        ],
        body: Body::Empty,
    }
}

/// Dialogue scene for the conversation intro screen (text + prompt audio).
pub fn build_scene_request(base_url: &str, token: &str, story: StoryId) -> HttpRequest {
    get(
        join_url(base_url, &format!("/api/stories/{}/scene", story.value())),
        token,
    )
}

/// Intro question: starts a conversation session server-side.
pub fn build_intro_question_request(base_url: &str, token: &str, story: StoryId) -> HttpRequest {
    get(
        join_url(
            base_url,
            &format!("/api/stories/{}/intro-question", story.value()),
        ),
        token,
    )
}

/// Reward ("action card") payload shown after a completed conversation.
pub fn build_action_card_request(base_url: &str, token: &str, story: StoryId) -> HttpRequest {
    get(
        join_url(
            base_url,
            &format!("/api/stories/{}/action-card", story.value()),
        ),
        token,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_authorized_story_requests() {
        let req = build_intro_question_request("https://api.example.com/", "tok", StoryId::new(5));
        assert_eq!(req.method, "GET");
        assert_eq!(req.url, "https://api.example.com/api/stories/5/intro-question");
        assert_eq!(req.header("authorization"), Some("Bearer tok"));

        let req = build_action_card_request("https://api.example.com", "tok", StoryId::new(5));
        assert!(req.url.ends_with("/api/stories/5/action-card"));

        let req = build_scene_request("https://api.example.com", "tok", StoryId::new(5));
        assert!(req.url.ends_with("/api/stories/5/scene"));
    }
}
