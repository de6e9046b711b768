use crate::error::SessionError;
use crate::traits::{
    ActionCard, ChildDirectory, DialogueScene, PlaybackSlot, SpeechOutput, StoryGateway,
    TurnExchange, TurnSubmission, VoiceCapture,
};
use murok_core::types::{ChildId, ConversationStage, SessionId, StoryId};
use std::sync::Arc;

/// Which screen of the conversation flow is authoritative right now.
/// Navigation mirrors this; gating decisions read it, never the URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenStage {
    Intro,
    Dialogue,
    Card,
}

/// Inner dialogue loop. Illegal events are rejected by checking this enum;
/// there are no per-call busy flags and no mutex: the machine is driven by
/// discrete events and at most one transition is in flight at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialoguePhase {
    Idle,
    WaitingForUser,
    Recording,
    Submitting,
    PlayingReply,
    Completed,
}

/// What a user event did, for the caller to re-render on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// State advanced.
    Handled,
    /// Event was illegal in the current state and was dropped.
    Ignored,
}

/// Where the dialogue went after a completed turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Back to waiting for the next utterance.
    Continue,
    /// Server signalled the end; the session is complete and the card
    /// screen is next.
    Finished,
    /// The release did not correspond to an active recording.
    Ignored,
}

/// Turn-taking state machine for one mounted conversation screen.
///
/// Owns the session identity and drives capture, playback and the remote
/// exchange. Constructed on screen entry, disposed on exit; never shared
/// and never a process-wide singleton.
pub struct ConversationSessionMachine {
    story_id: StoryId,
    screen: ScreenStage,
    phase: DialoguePhase,
    session_id: Option<SessionId>,
    stage: ConversationStage,
    child_id: Option<ChildId>,
    completed: bool,
    fail_notified: bool,
    disposed: bool,
    scene: Option<DialogueScene>,
    card: Option<ActionCard>,

    turns: Arc<dyn TurnExchange>,
    stories: Arc<dyn StoryGateway>,
    children: Arc<dyn ChildDirectory>,
    capture: Arc<dyn VoiceCapture>,
    speech: Arc<dyn SpeechOutput>,
}

impl ConversationSessionMachine {
    pub fn new(
        story_id: StoryId,
        turns: Arc<dyn TurnExchange>,
        stories: Arc<dyn StoryGateway>,
        children: Arc<dyn ChildDirectory>,
        capture: Arc<dyn VoiceCapture>,
        speech: Arc<dyn SpeechOutput>,
    ) -> Self {
        Self {
            story_id,
            screen: ScreenStage::Intro,
            phase: DialoguePhase::Idle,
            session_id: None,
            stage: ConversationStage::new("S1"),
            child_id: None,
            completed: false,
            fail_notified: false,
            disposed: false,
            scene: None,
            card: None,
            turns,
            stories,
            children,
            capture,
            speech,
        }
    }

    pub fn story_id(&self) -> StoryId {
        self.story_id
    }

    pub fn screen(&self) -> ScreenStage {
        self.screen
    }

    pub fn phase(&self) -> DialoguePhase {
        self.phase
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    pub fn conversation_stage(&self) -> &ConversationStage {
        &self.stage
    }

    pub fn child_id(&self) -> Option<ChildId> {
        self.child_id
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Current display scene (intro text, or the latest AI line once the
    /// dialogue is running).
    pub fn scene(&self) -> Option<&DialogueScene> {
        self.scene.as_ref()
    }

    /// Mic availability for rendering: only a waiting dialogue accepts a
    /// press, everything else shows the button disabled.
    pub fn mic_enabled(&self) -> bool {
        self.screen == ScreenStage::Dialogue && self.phase == DialoguePhase::WaitingForUser
    }

    /// Load the intro scene. Failure is a blocking error: the screen shows
    /// nothing until a reload succeeds.
    pub async fn load_intro(&mut self) -> Result<(), SessionError> {
        if self.disposed {
            return Ok(());
        }
        let scene = self
            .stories
            .fetch_scene(self.story_id)
            .await
            .map_err(SessionError::Intro)?;
        self.scene = Some(scene);
        Ok(())
    }

    /// Resolve the active child profile. The lookup races the user reaching
    /// the mic button; absence is handled there, so a failure here is only
    /// logged and the mic stays gated.
    pub async fn resolve_child(&mut self) {
        if self.disposed || self.child_id.is_some() {
            return;
        }
        match self.children.current_child().await {
            Ok(profile) => {
                log::info!("child profile loaded: id={}", profile.id.value());
                self.child_id = Some(profile.id);
            }
            Err(e) => log::warn!("child profile lookup failed: {e}"),
        }
    }

    /// "Talk" pressed on the intro screen: open the session.
    ///
    /// A second initiation while one is in flight (or after one succeeded)
    /// is ignored: the session id is assigned at most once per screen.
    /// On failure the user stays on the intro screen and can press again.
    pub async fn start_dialogue(&mut self) -> Result<EventOutcome, SessionError> {
        if self.disposed || self.screen != ScreenStage::Intro || self.session_id.is_some() {
            return Ok(EventOutcome::Ignored);
        }

        let intro = self
            .turns
            .fetch_intro(self.story_id)
            .await
            .map_err(SessionError::Intro)?;

        self.session_id = Some(intro.session_id.clone());
        self.stage = intro.stage.clone();
        self.scene = Some(DialogueScene {
            text_content: intro.text_content.clone(),
            img_url: intro.img_url.clone(),
            audio_url: Some(intro.audio_url.clone()),
        });
        self.screen = ScreenStage::Dialogue;

        // The question plays before the child may answer; a playback failure
        // is swallowed so a broken speaker cannot wedge the session.
        self.phase = DialoguePhase::PlayingReply;
        if let Err(e) = self
            .speech
            .play_to_end(PlaybackSlot::Reply, &intro.audio_url)
            .await
        {
            log::warn!("question playback failed: {e}");
        }
        self.phase = DialoguePhase::WaitingForUser;

        Ok(EventOutcome::Handled)
    }

    /// Mic pressed and held. Rejected outside a waiting dialogue; rejected
    /// with a user-visible message while the child profile is still loading.
    pub async fn press_record(&mut self) -> Result<EventOutcome, SessionError> {
        if self.disposed
            || self.screen != ScreenStage::Dialogue
            || self.phase != DialoguePhase::WaitingForUser
        {
            return Ok(EventOutcome::Ignored);
        }
        if self.child_id.is_none() {
            return Err(SessionError::ChildNotReady);
        }

        self.capture.start().await.map_err(SessionError::Capture)?;
        self.phase = DialoguePhase::Recording;
        Ok(EventOutcome::Handled)
    }

    /// Mic released: submit the utterance and play the reply.
    ///
    /// The machine stays in `Submitting` until the exchange settles (the
    /// transport has a bounded timeout), so a duplicate submission of the
    /// same turn is unrepresentable; retry is user-driven afterwards.
    /// A failed turn returns to `WaitingForUser` without touching the
    /// session: one bad turn never abandons the conversation.
    pub async fn release_record(&mut self) -> Result<TurnOutcome, SessionError> {
        if self.disposed || self.phase != DialoguePhase::Recording {
            return Ok(TurnOutcome::Ignored);
        }

        let clip = match self.capture.stop().await {
            Ok(clip) => clip,
            Err(e) => {
                self.phase = DialoguePhase::WaitingForUser;
                return Err(SessionError::Capture(e));
            }
        };
        let Some(clip) = clip else {
            // Release without captured audio; nothing to submit.
            self.phase = DialoguePhase::WaitingForUser;
            return Ok(TurnOutcome::Ignored);
        };

        // Recording is only reachable with a session and a child resolved.
        let (session_id, child_id) = match (self.session_id.clone(), self.child_id) {
            (Some(s), Some(c)) => (s, c),
            _ => {
                self.phase = DialoguePhase::WaitingForUser;
                return Ok(TurnOutcome::Ignored);
            }
        };

        self.phase = DialoguePhase::Submitting;

        let reply = self
            .turns
            .submit_turn(TurnSubmission {
                session_id,
                child_id,
                story_id: self.story_id,
                stage: self.stage.clone(),
                clip,
            })
            .await;

        let reply = match reply {
            Ok(r) => r,
            Err(e) => {
                self.phase = DialoguePhase::WaitingForUser;
                return Err(SessionError::Turn(e));
            }
        };

        if !reply.ai_text.is_empty() {
            if let Some(scene) = &mut self.scene {
                scene.text_content = reply.ai_text.clone();
            }
        }
        // The server is authoritative for progress; never guess the stage.
        if let Some(next) = reply.next_stage {
            self.stage = next;
        }

        if let Some(url) = &reply.reply_audio_url {
            self.phase = DialoguePhase::PlayingReply;
            if let Err(e) = self.speech.play_to_end(PlaybackSlot::Reply, url).await {
                log::warn!("reply playback failed: {e}");
            }
        }

        if reply.is_end {
            self.completed = true;
            self.phase = DialoguePhase::Completed;
            self.screen = ScreenStage::Card;
            Ok(TurnOutcome::Finished)
        } else {
            self.phase = DialoguePhase::WaitingForUser;
            Ok(TurnOutcome::Continue)
        }
    }

    /// Reward card, fetched once per session lifetime. Safe to call again
    /// when the user navigates back and forward.
    pub async fn action_card(&mut self) -> Result<ActionCard, SessionError> {
        if let Some(card) = &self.card {
            return Ok(card.clone());
        }
        let card = self
            .stories
            .fetch_action_card(self.story_id)
            .await
            .map_err(SessionError::Card)?;
        self.card = Some(card.clone());
        Ok(card)
    }

    /// Screen teardown: stop audio and, when a live session is being
    /// abandoned, notify the server exactly once. The notification is
    /// dispatched fire-and-forget; teardown never waits for it.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.speech.stop_all();

        if let Some(session_id) = &self.session_id {
            if !self.completed && !self.fail_notified {
                self.fail_notified = true;
                self.turns.mark_session_failed(session_id);
            }
        }
    }
}

impl Drop for ConversationSessionMachine {
    fn drop(&mut self) {
        // Dropping an undisposed machine is itself an abandonment.
        self.dispose();
    }
}
