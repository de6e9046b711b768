use async_trait::async_trait;
use murok_appcore::conversation_screen::ConversationScreen;
use murok_appcore::user_facing::describe_session_error;
use murok_core::config::ApiConfig;
use murok_core::types::{ChildId, ConversationStage, SessionId, StoryId};
use murok_engine::conversation::TurnOutcome;
use murok_engine::traits::{
    ActionCard, ChildDirectory, ChildProfile, DialogueScene, IntroQuestion, PlaybackSlot,
    RecordedClip, SpeechOutput, StoryGateway, TurnExchange, TurnReply, TurnSubmission,
    VoiceCapture,
};
use murok_runtime::clients::{ClientAuth, HttpChildDirectory, HttpStoryGateway, HttpTurnExchange};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

struct ScriptedExchange {
    replies: Mutex<VecDeque<TurnReply>>,
}

#[async_trait]
impl TurnExchange for ScriptedExchange {
    async fn fetch_intro(&self, _story: StoryId) -> anyhow::Result<IntroQuestion> {
        Ok(IntroQuestion {
            session_id: SessionId::new("demo-session"),
            stage: ConversationStage::new("S1"),
            audio_url: "demo://question".into(),
            text_content: "How do you think she felt when the jar had a hole in it?".into(),
            img_url: None,
        })
    }

    async fn submit_turn(&self, submission: TurnSubmission) -> anyhow::Result<TurnReply> {
        println!(
            "[turn] stage={} clip={} bytes",
            submission.stage.as_str(),
            submission.clip.bytes.len()
        );
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("script exhausted"))
    }

    fn mark_session_failed(&self, session: &SessionId) {
        println!("[fail-notify] session={}", session.as_str());
    }
}

struct ScriptedStories;

#[async_trait]
impl StoryGateway for ScriptedStories {
    async fn fetch_scene(&self, _story: StoryId) -> anyhow::Result<DialogueScene> {
        Ok(DialogueScene {
            text_content: "The stepmother told her to fill the jar with water.".into(),
            img_url: None,
            audio_url: None,
        })
    }

    async fn fetch_action_card(&self, _story: StoryId) -> anyhow::Result<ActionCard> {
        Ok(ActionCard {
            title: "Notice how a friend feels".into(),
            situation_content: "A friend's face doesn't look happy.".into(),
            action_content: "Look slowly at their eyes and mouth, and guess the feeling.".into(),
            img_url: "demo://card.png".into(),
        })
    }
}

struct ScriptedChild;

#[async_trait]
impl ChildDirectory for ScriptedChild {
    async fn current_child(&self) -> anyhow::Result<ChildProfile> {
        Ok(ChildProfile {
            id: ChildId::new(1),
            name: "Demo".into(),
        })
    }
}

struct ScriptedMic;

#[async_trait]
impl VoiceCapture for ScriptedMic {
    async fn start(&self) -> anyhow::Result<()> {
        println!("[mic] recording...");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<Option<RecordedClip>> {
        Ok(Some(RecordedClip {
            bytes: vec![0; 320],
            mime_type: "audio/wav".into(),
        }))
    }
}

struct PrintingSpeaker;

#[async_trait]
impl SpeechOutput for PrintingSpeaker {
    async fn play_to_end(&self, _slot: PlaybackSlot, url: &str) -> anyhow::Result<()> {
        println!("[audio] played {url}");
        Ok(())
    }

    fn stop_all(&self) {}
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Demo behavior: run a scripted three-turn conversation end to end.
    // Set MUROK_API_URL (and MUROK_API_TOKEN) to exercise a real backend
    // instead of the scripted collaborators.

    let story = StoryId::new(
        std::env::var("MUROK_STORY_ID")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1),
    );

    let mut screen = match std::env::var("MUROK_API_URL") {
        Ok(base_url) => {
            let cfg = ApiConfig::new(base_url);
            let auth = match std::env::var("MUROK_API_TOKEN") {
                Ok(token) => ClientAuth::with_token(token),
                Err(_) => ClientAuth::from_keyring(),
            };
            ConversationScreen::with_collaborators(
                story,
                Arc::new(HttpTurnExchange::new(cfg.clone(), auth.clone())),
                Arc::new(HttpStoryGateway::new(cfg.clone(), auth.clone())),
                Arc::new(HttpChildDirectory::new(cfg, auth)),
                Arc::new(ScriptedMic),
                Arc::new(PrintingSpeaker),
            )
        }
        Err(_) => {
            let replies = VecDeque::from([
                TurnReply {
                    ai_text: "I see. Why do you think she was sad?".into(),
                    next_stage: Some(ConversationStage::new("S2")),
                    reply_audio_url: Some("demo://turn1".into()),
                    is_end: false,
                },
                TurnReply {
                    ai_text: "That makes sense. What could you do for her?".into(),
                    next_stage: Some(ConversationStage::new("S3")),
                    reply_audio_url: Some("demo://turn2".into()),
                    is_end: false,
                },
                TurnReply {
                    ai_text: "You did wonderfully today!".into(),
                    next_stage: None,
                    reply_audio_url: None,
                    is_end: true,
                },
            ]);
            ConversationScreen::with_collaborators(
                story,
                Arc::new(ScriptedExchange {
                    replies: Mutex::new(replies),
                }),
                Arc::new(ScriptedStories),
                Arc::new(ScriptedChild),
                Arc::new(ScriptedMic),
                Arc::new(PrintingSpeaker),
            )
        }
    };

    screen.enter().await.map_err(|e| {
        anyhow::anyhow!("{}", describe_session_error(&e))
    })?;
    println!(
        "[intro] {}",
        screen.machine().scene().map(|s| s.text_content.as_str()).unwrap_or("")
    );

    screen.start_dialogue().await.map_err(|e| {
        anyhow::anyhow!("{}", describe_session_error(&e))
    })?;
    println!(
        "[dialogue] session={} stage={}",
        screen
            .machine()
            .session_id()
            .map(|s| s.as_str())
            .unwrap_or("?"),
        screen.machine().conversation_stage().as_str()
    );

    // Bounded so a misbehaving backend can't loop the demo forever.
    for _ in 0..10 {
        if let Err(e) = screen.press_mic().await {
            println!("[retry] {}", describe_session_error(&e));
            continue;
        }

        match screen.release_mic().await {
            Ok(TurnOutcome::Continue) => {
                println!(
                    "[ai] {} (stage {})",
                    screen.machine().scene().map(|s| s.text_content.as_str()).unwrap_or(""),
                    screen.machine().conversation_stage().as_str()
                );
            }
            Ok(TurnOutcome::Finished) => {
                println!(
                    "[ai] {}",
                    screen.machine().scene().map(|s| s.text_content.as_str()).unwrap_or("")
                );
                break;
            }
            Ok(TurnOutcome::Ignored) => continue,
            Err(e) => {
                println!("[retry] {}", describe_session_error(&e));
            }
        }
    }

    let card = screen
        .action_card()
        .await
        .map_err(|e| anyhow::anyhow!("{}", describe_session_error(&e)))?;
    println!("[card] {}: {}", card.title, card.action_content);

    screen.dispose();
    Ok(())
}
