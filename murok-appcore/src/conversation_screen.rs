use crate::bridges::{MicBridge, SpeakerBridge};
use murok_audio::{AudioSlot, PlaybackController};
use murok_core::config::ApiConfig;
use murok_core::types::StoryId;
use murok_engine::conversation::{ConversationSessionMachine, EventOutcome, TurnOutcome};
use murok_engine::error::SessionError;
use murok_engine::traits::{ActionCard, ChildDirectory, SpeechOutput, StoryGateway, TurnExchange, VoiceCapture};
use murok_runtime::clients::{ClientAuth, HttpChildDirectory, HttpStoryGateway, HttpTurnExchange};
use std::sync::Arc;

/// One mounted conversation screen: owns the machine and the audio devices,
/// and translates UI/lifecycle events into machine events.
///
/// Constructed on navigation into the flow, disposed on navigation out.
/// Everything here is an owned instance; nothing is process-global.
pub struct ConversationScreen {
    machine: ConversationSessionMachine,
    playback: Arc<PlaybackController>,
    disposed: bool,
}

impl ConversationScreen {
    pub fn new(story_id: StoryId, cfg: ApiConfig, auth: ClientAuth) -> Self {
        let playback = Arc::new(PlaybackController::new());
        let machine = ConversationSessionMachine::new(
            story_id,
            Arc::new(HttpTurnExchange::new(cfg.clone(), auth.clone())),
            Arc::new(HttpStoryGateway::new(cfg.clone(), auth.clone())),
            Arc::new(HttpChildDirectory::new(cfg, auth)),
            Arc::new(MicBridge::new()),
            Arc::new(SpeakerBridge::new(playback.clone())),
        );
        Self {
            machine,
            playback,
            disposed: false,
        }
    }

    /// Same wiring with the collaborators swapped out (tests, demos).
    pub fn with_collaborators(
        story_id: StoryId,
        turns: Arc<dyn TurnExchange>,
        stories: Arc<dyn StoryGateway>,
        children: Arc<dyn ChildDirectory>,
        capture: Arc<dyn VoiceCapture>,
        speech: Arc<dyn SpeechOutput>,
    ) -> Self {
        let playback = Arc::new(PlaybackController::new());
        let machine =
            ConversationSessionMachine::new(story_id, turns, stories, children, capture, speech);
        Self {
            machine,
            playback,
            disposed: false,
        }
    }

    pub fn machine(&self) -> &ConversationSessionMachine {
        &self.machine
    }

    /// Screen mounted: load the intro scene, kick off the profile lookup,
    /// and start the prompt narration if the scene carries audio.
    pub async fn enter(&mut self) -> Result<(), SessionError> {
        self.machine.load_intro().await?;
        self.machine.resolve_child().await;

        if let Some(url) = self
            .machine
            .scene()
            .and_then(|s| s.audio_url.clone())
        {
            match murok_providers::runtime::fetch_bytes(&url).await {
                Ok(bytes) => self.playback.set_clip(AudioSlot::Prompt, bytes, true),
                Err(e) => log::warn!("prompt narration unavailable: {e}"),
            }
        }
        Ok(())
    }

    /// "Listen again" on the intro screen. Always restarts from zero and is
    /// harmless when no narration is loaded.
    pub fn replay_prompt(&self) {
        self.playback.replay(AudioSlot::Prompt);
    }

    /// "Talk" pressed: the reply audio supersedes the prompt narration.
    pub async fn start_dialogue(&mut self) -> Result<EventOutcome, SessionError> {
        self.playback.clear(AudioSlot::Prompt);
        self.machine.start_dialogue().await
    }

    pub async fn press_mic(&mut self) -> Result<EventOutcome, SessionError> {
        self.machine.press_record().await
    }

    pub async fn release_mic(&mut self) -> Result<TurnOutcome, SessionError> {
        self.machine.release_record().await
    }

    pub async fn action_card(&mut self) -> Result<ActionCard, SessionError> {
        self.machine.action_card().await
    }

    /// App lost foreground: nothing should keep sounding.
    pub fn on_hidden(&self) {
        self.playback.suspend();
    }

    /// App back in foreground: slots resume only if still eligible.
    pub fn on_visible(&self) {
        self.playback.resume();
    }

    /// Screen teardown. Never blocks: the abandonment notification inside
    /// the machine is fire-and-forget, and audio stops synchronously.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.machine.dispose();
        self.playback.clear(AudioSlot::Prompt);
        self.playback.clear(AudioSlot::Reply);
    }
}

impl Drop for ConversationScreen {
    fn drop(&mut self) {
        self.dispose();
    }
}
