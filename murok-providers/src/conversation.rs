use crate::request::{Body, HttpRequest, bearer_header, join_url};
use murok_core::types::{ChildId, ConversationStage, SessionId, StoryId};

/// One recorded utterance ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnParams {
    pub session_id: SessionId,
    pub child_id: ChildId,
    pub story_id: StoryId,
    pub stage: ConversationStage,
}

/// Multipart upload of one conversation turn: the audio file plus the
/// session/child/story/stage form fields the server keys the turn on.
pub fn build_turn_request(
    base_url: &str,
    token: &str,
    params: &TurnParams,
    audio: &AudioClip,
) -> HttpRequest {
    let boundary = format!("Boundary-{}", uuid::Uuid::new_v4());

    let mut body: Vec<u8> = Vec::new();

    append_file(
        &mut body,
        &boundary,
        "audio",
        &audio.filename,
        &audio.mime_type,
        &audio.bytes,
    );
    append_field(&mut body, &boundary, "session_id", params.session_id.as_str());
    append_field(&mut body, &boundary, "child_id", &params.child_id.value().to_string());
    append_field(&mut body, &boundary, "story_id", &params.story_id.value().to_string());
    append_field(&mut body, &boundary, "stage", params.stage.as_str());

    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

    HttpRequest {
        method: "POST".into(),
        url: join_url(base_url, "/api/conversations/turn"),
        headers: vec![
            (
                "Content-Type".into(),
                format!("multipart/form-data; boundary={}", boundary),
            ),
            ("Accept".into(), "application/json".into()),
            bearer_header(token),
        ],
        body: Body::MultipartFormData {
            boundary,
            bytes: body,
        },
    }
}

/// Best-effort abandonment notification. The response is ignored by callers.
pub fn build_session_failed_request(
    base_url: &str,
    token: &str,
    session: &SessionId,
) -> HttpRequest {
    HttpRequest {
        method: "PATCH".into(),
        url: join_url(
            base_url,
            &format!("/api/conversations/{}/fail", session.as_str()),
        ),
        headers: vec![
            ("Accept".into(), "application/json".into()),
            bearer_header(token),
        ],
        body: Body::Empty,
    }
}

fn append_field(body: &mut Vec<u8>, boundary: &str, name: &str, value: &str) {
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
    );
    body.extend_from_slice(value.as_bytes());
    body.extend_from_slice(b"\r\n");
}

fn append_file(
    body: &mut Vec<u8>,
    boundary: &str,
    name: &str,
    filename: &str,
    mime_type: &str,
    bytes: &[u8],
) {
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            name, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", mime_type).as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(b"\r\n");
}
