use crate::request::{Body, HttpRequest, bearer_header, join_url};
use murok_core::progress::ReadingProgress;
use murok_core::types::{ChildId, StoryId};
use serde_json::json;

fn pages_url(base_url: &str, story: StoryId, child: ChildId) -> String {
    join_url(
        base_url,
        &format!(
            "/api/stories/{}/children/{}/pages",
            story.value(),
            child.value()
        ),
    )
}

/// Last-read position lookup for resuming a story.
pub fn build_last_page_request(
    base_url: &str,
    token: &str,
    story: StoryId,
    child: ChildId,
) -> HttpRequest {
    HttpRequest {
        method: "GET".into(),
        url: pages_url(base_url, story, child),
        headers: vec![
            ("Accept".into(), "application/json".into()),
            bearer_header(token),
        ],
        body: Body::Empty,
    }
}

/// Progress save. Both the awaited and the exit-safe delivery modes send
/// this same request; the difference is entirely in how it is dispatched.
pub fn build_save_progress_request(
    base_url: &str,
    token: &str,
    progress: &ReadingProgress,
) -> HttpRequest {
    let payload = json!({
        "page_number": progress.page_number,
        "is_end": progress.is_end,
    });

    HttpRequest {
        method: "PATCH".into(),
        url: pages_url(base_url, progress.story_id, progress.child_id),
        headers: vec![
            ("Content-Type".into(), "application/json".into()),
            ("Accept".into(), "application/json".into()),
            bearer_header(token),
        ],
        body: Body::Json(payload.to_string()),
    }
}
