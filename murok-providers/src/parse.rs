use anyhow::{Context, anyhow};
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Standard response envelope used by every endpoint.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

/// Unwrap the `{success, message, data}` envelope or surface the server's
/// own message as the error.
pub fn parse_envelope<T: DeserializeOwned>(body: &[u8]) -> anyhow::Result<T> {
    let env: Envelope<T> = serde_json::from_slice(body).context("decode response envelope")?;
    if !env.success {
        return Err(anyhow!(
            "server rejected request: {}",
            env.message.unwrap_or_else(|| "no message".into())
        ));
    }
    env.data.ok_or_else(|| anyhow!("envelope has no data"))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IntroQuestionDto {
    pub session_id: String,
    pub current_stage: String,
    pub audio_url: String,
    pub text_content: String,
    #[serde(default)]
    pub img_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TurnReplyDto {
    pub ai_text: String,
    #[serde(default)]
    pub next_stage: Option<String>,
    #[serde(default)]
    pub tts_audio_url: Option<String>,
    pub is_end: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DialogueSceneDto {
    pub text_content: String,
    #[serde(default)]
    pub img_url: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ActionCardDto {
    pub title: String,
    pub situation_content: String,
    pub action_content: String,
    pub img_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PageProgressDto {
    pub page_number: u32,
    #[serde(default)]
    pub is_end: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChildProfileDto {
    pub id: i64,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_intro_question_envelope() {
        let body = br#"{"success":true,"data":{"session_id":"abc","current_stage":"S1","audio_url":"a.mp3","text_content":"Hello"}}"#;
        let dto: IntroQuestionDto = parse_envelope(body).unwrap();
        assert_eq!(dto.session_id, "abc");
        assert_eq!(dto.current_stage, "S1");
        assert_eq!(dto.audio_url, "a.mp3");
        assert_eq!(dto.img_url, None);
    }

    #[test]
    fn parses_turn_reply_without_audio() {
        let body = br#"{"success":true,"data":{"ai_text":"Good job","is_end":true}}"#;
        let dto: TurnReplyDto = parse_envelope(body).unwrap();
        assert!(dto.is_end);
        assert_eq!(dto.next_stage, None);
        assert_eq!(dto.tts_audio_url, None);
    }

    #[test]
    fn failed_envelope_surfaces_server_message() {
        let body = br#"{"success":false,"message":"story not found"}"#;
        let err = parse_envelope::<IntroQuestionDto>(body).unwrap_err();
        assert!(err.to_string().contains("story not found"));
    }

    #[test]
    fn envelope_without_data_errors() {
        let body = br#"{"success":true}"#;
        assert!(parse_envelope::<PageProgressDto>(body).is_err());
    }
}
