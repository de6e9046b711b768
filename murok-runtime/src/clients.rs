//
// HTTP implementations of the engine's collaborator seams.
//
// Every request goes through the shared providers executor (bounded
// timeouts); the fire-and-forget operations build their request fully,
// including the credential, before handing it to `dispatch_best_effort`.

use async_trait::async_trait;
use murok_core::config::ApiConfig;
use murok_core::progress::ReadingProgress;
use murok_core::types::{ChildId, ConversationStage, SessionId, StoryId};
use murok_engine::traits::{
    ActionCard, ChildDirectory, ChildProfile, DialogueScene, IntroQuestion, ProgressStore,
    StoryGateway, TurnExchange, TurnReply, TurnSubmission,
};
use murok_providers::parse;
use murok_providers::request::HttpRequest;
use murok_providers::runtime::{dispatch_best_effort, execute};
use serde::de::DeserializeOwned;

use crate::secrets::{SecretKey, get_secret};

/// Bearer credential source for one client instance.
///
/// The host's auth layer normally injects the token it manages; falling
/// back to the keyring covers the teardown paths where that layer is
/// already gone.
#[derive(Debug, Clone)]
pub struct ClientAuth {
    override_token: Option<String>,
}

impl ClientAuth {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            override_token: Some(token.into()),
        }
    }

    pub fn from_keyring() -> Self {
        Self {
            override_token: None,
        }
    }

    /// Resolve the credential now, synchronously. Exit-safe senders call
    /// this at dispatch time so they never depend on torn-down state.
    pub fn bearer(&self) -> String {
        if let Some(token) = &self.override_token {
            return token.clone();
        }
        match get_secret(SecretKey::ApiBearerToken) {
            Ok(Some(token)) => token,
            Ok(None) => {
                log::warn!("no bearer token in credential storage");
                String::new()
            }
            Err(e) => {
                log::warn!("credential storage read failed: {e}");
                String::new()
            }
        }
    }
}

async fn fetch_json<T: DeserializeOwned>(req: &HttpRequest) -> anyhow::Result<T> {
    let resp = execute(req).await?;
    if !(200..=299).contains(&resp.status) {
        return Err(anyhow::anyhow!(
            "request failed: {} {} -> status {}",
            req.method,
            req.url,
            resp.status
        ));
    }
    parse::parse_envelope(&resp.body)
}

pub struct HttpTurnExchange {
    cfg: ApiConfig,
    auth: ClientAuth,
}

impl HttpTurnExchange {
    pub fn new(cfg: ApiConfig, auth: ClientAuth) -> Self {
        Self { cfg, auth }
    }
}

#[async_trait]
impl TurnExchange for HttpTurnExchange {
    async fn fetch_intro(&self, story: StoryId) -> anyhow::Result<IntroQuestion> {
        let req = murok_providers::story::build_intro_question_request(
            &self.cfg.base_url,
            &self.auth.bearer(),
            story,
        );
        let dto: parse::IntroQuestionDto = fetch_json(&req).await?;
        Ok(IntroQuestion {
            session_id: SessionId::new(dto.session_id),
            stage: ConversationStage::new(dto.current_stage),
            audio_url: dto.audio_url,
            text_content: dto.text_content,
            img_url: dto.img_url,
        })
    }

    async fn submit_turn(&self, submission: TurnSubmission) -> anyhow::Result<TurnReply> {
        let req = murok_providers::conversation::build_turn_request(
            &self.cfg.base_url,
            &self.auth.bearer(),
            &murok_providers::conversation::TurnParams {
                session_id: submission.session_id,
                child_id: submission.child_id,
                story_id: submission.story_id,
                stage: submission.stage,
            },
            &murok_providers::conversation::AudioClip {
                filename: "utterance.wav".into(),
                mime_type: submission.clip.mime_type,
                bytes: submission.clip.bytes,
            },
        );
        let dto: parse::TurnReplyDto = fetch_json(&req).await?;
        Ok(TurnReply {
            ai_text: dto.ai_text,
            next_stage: dto.next_stage.map(ConversationStage::new),
            reply_audio_url: dto.tts_audio_url,
            is_end: dto.is_end,
        })
    }

    fn mark_session_failed(&self, session: &SessionId) {
        // Credential and URL are resolved here, before dispatch; the send
        // must not rely on anything the teardown may clear afterwards.
        let req = murok_providers::conversation::build_session_failed_request(
            &self.cfg.base_url,
            &self.auth.bearer(),
            session,
        );
        dispatch_best_effort(req);
    }
}

pub struct HttpStoryGateway {
    cfg: ApiConfig,
    auth: ClientAuth,
}

impl HttpStoryGateway {
    pub fn new(cfg: ApiConfig, auth: ClientAuth) -> Self {
        Self { cfg, auth }
    }
}

#[async_trait]
impl StoryGateway for HttpStoryGateway {
    async fn fetch_scene(&self, story: StoryId) -> anyhow::Result<DialogueScene> {
        let req = murok_providers::story::build_scene_request(
            &self.cfg.base_url,
            &self.auth.bearer(),
            story,
        );
        let dto: parse::DialogueSceneDto = fetch_json(&req).await?;
        Ok(DialogueScene {
            text_content: dto.text_content,
            img_url: dto.img_url,
            audio_url: dto.audio_url,
        })
    }

    async fn fetch_action_card(&self, story: StoryId) -> anyhow::Result<ActionCard> {
        let req = murok_providers::story::build_action_card_request(
            &self.cfg.base_url,
            &self.auth.bearer(),
            story,
        );
        let dto: parse::ActionCardDto = fetch_json(&req).await?;
        Ok(ActionCard {
            title: dto.title,
            situation_content: dto.situation_content,
            action_content: dto.action_content,
            img_url: dto.img_url,
        })
    }
}

pub struct HttpChildDirectory {
    cfg: ApiConfig,
    auth: ClientAuth,
}

impl HttpChildDirectory {
    pub fn new(cfg: ApiConfig, auth: ClientAuth) -> Self {
        Self { cfg, auth }
    }
}

#[async_trait]
impl ChildDirectory for HttpChildDirectory {
    async fn current_child(&self) -> anyhow::Result<ChildProfile> {
        let req =
            murok_providers::profile::build_child_profile_request(&self.cfg.base_url, &self.auth.bearer());
        let dto: parse::ChildProfileDto = fetch_json(&req).await?;
        Ok(ChildProfile {
            id: ChildId::new(dto.id),
            name: dto.name,
        })
    }
}

pub struct HttpProgressStore {
    cfg: ApiConfig,
    auth: ClientAuth,
}

impl HttpProgressStore {
    pub fn new(cfg: ApiConfig, auth: ClientAuth) -> Self {
        Self { cfg, auth }
    }
}

#[async_trait]
impl ProgressStore for HttpProgressStore {
    async fn last_read_page(&self, story: StoryId, child: ChildId) -> anyhow::Result<u32> {
        let req = murok_providers::progress::build_last_page_request(
            &self.cfg.base_url,
            &self.auth.bearer(),
            story,
            child,
        );
        let dto: parse::PageProgressDto = fetch_json(&req).await?;
        Ok(dto.page_number)
    }

    async fn save(&self, progress: &ReadingProgress) -> anyhow::Result<()> {
        let req = murok_providers::progress::build_save_progress_request(
            &self.cfg.base_url,
            &self.auth.bearer(),
            progress,
        );
        let resp = execute(&req).await?;
        if !(200..=299).contains(&resp.status) {
            return Err(anyhow::anyhow!("progress save rejected: status {}", resp.status));
        }
        Ok(())
    }

    fn save_on_exit(&self, progress: &ReadingProgress) {
        // Same endpoint as the awaited save, but fully built right now
        // (page number and credential included) and sent detached so it
        // survives the caller's teardown.
        let req = murok_providers::progress::build_save_progress_request(
            &self.cfg.base_url,
            &self.auth.bearer(),
            progress,
        );
        dispatch_best_effort(req);
    }
}
