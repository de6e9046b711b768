use async_trait::async_trait;
use murok_core::progress::ReadingProgress;
use murok_core::types::{ChildId, ConversationStage, SessionId, StoryId};
use serde::{Deserialize, Serialize};

/// One finished utterance from the microphone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedClip {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Scene shown on the conversation intro screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueScene {
    pub text_content: String,
    pub img_url: Option<String>,
    pub audio_url: Option<String>,
}

/// Server answer to the intro-question fetch; opens the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntroQuestion {
    pub session_id: SessionId,
    pub stage: ConversationStage,
    pub audio_url: String,
    pub text_content: String,
    pub img_url: Option<String>,
}

/// Server answer to one submitted turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReply {
    pub ai_text: String,
    pub next_stage: Option<ConversationStage>,
    pub reply_audio_url: Option<String>,
    pub is_end: bool,
}

/// Reward payload shown after a completed conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCard {
    pub title: String,
    pub situation_content: String,
    pub action_content: String,
    pub img_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildProfile {
    pub id: ChildId,
    pub name: String,
}

/// Everything the server needs to process one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnSubmission {
    pub session_id: SessionId,
    pub child_id: ChildId,
    pub story_id: StoryId,
    pub stage: ConversationStage,
    pub clip: RecordedClip,
}

/// Remote conversation service.
#[async_trait]
pub trait TurnExchange: Send + Sync {
    async fn fetch_intro(&self, story: StoryId) -> anyhow::Result<IntroQuestion>;

    /// Not idempotent server-side: callers must never auto-retry.
    async fn submit_turn(&self, submission: TurnSubmission) -> anyhow::Result<TurnReply>;

    /// Best-effort abandonment notification. Implementations dispatch
    /// without awaiting and swallow failures; callers never observe them.
    fn mark_session_failed(&self, session: &SessionId);
}

/// Story content lookups (scene, reward card).
#[async_trait]
pub trait StoryGateway: Send + Sync {
    async fn fetch_scene(&self, story: StoryId) -> anyhow::Result<DialogueScene>;
    async fn fetch_action_card(&self, story: StoryId) -> anyhow::Result<ActionCard>;
}

/// Profile lookup gating turn submission.
#[async_trait]
pub trait ChildDirectory: Send + Sync {
    async fn current_child(&self) -> anyhow::Result<ChildProfile>;
}

/// Remote reading-progress record.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn last_read_page(&self, story: StoryId, child: ChildId) -> anyhow::Result<u32>;

    async fn save(&self, progress: &ReadingProgress) -> anyhow::Result<()>;

    /// Exit-safe variant: must be dispatchable during teardown. All values
    /// live in `progress` before the call; implementations capture their
    /// credentials synchronously and never await.
    fn save_on_exit(&self, progress: &ReadingProgress);
}

/// Microphone seam. Start/stop are bound to the press-hold-release gesture.
#[async_trait]
pub trait VoiceCapture: Send + Sync {
    async fn start(&self) -> anyhow::Result<()>;

    /// `None` when no recording was active (release without a press).
    async fn stop(&self) -> anyhow::Result<Option<RecordedClip>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackSlot {
    Prompt,
    Reply,
}

/// Speaker seam. The machine, not the audio object, decides what happens
/// after a clip ends: `play_to_end` resolves when the clip has finished.
/// Playback trouble (missing device, undecodable clip) resolves Ok after
/// logging; it is retryable via replay, never fatal to the session.
#[async_trait]
pub trait SpeechOutput: Send + Sync {
    async fn play_to_end(&self, slot: PlaybackSlot, url: &str) -> anyhow::Result<()>;

    fn stop_all(&self);
}
