use async_trait::async_trait;
use murok_appcore::bridges::SpeakerBridge;
use murok_appcore::conversation_screen::ConversationScreen;
use murok_appcore::reading_screen::ReadingScreen;
use murok_audio::PlaybackController;
use murok_core::config::ApiConfig;
use murok_core::types::{ChildId, StoryId};
use murok_engine::conversation::{ScreenStage, TurnOutcome};
use murok_engine::traits::{RecordedClip, VoiceCapture};
use murok_runtime::clients::{
    ClientAuth, HttpChildDirectory, HttpProgressStore, HttpStoryGateway, HttpTurnExchange,
};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// CI runners have no microphone; the mic seam is the one collaborator that
// must be faked to drive a full conversation.
struct FakeMic;

#[async_trait]
impl VoiceCapture for FakeMic {
    async fn start(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<Option<RecordedClip>> {
        Ok(Some(RecordedClip {
            bytes: vec![1, 2, 3],
            mime_type: "audio/wav".into(),
        }))
    }
}

async fn mount_conversation_endpoints(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/stories/10/scene"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            format!(
                r#"{{"success":true,"data":{{"text_content":"Once upon a time","audio_url":"{}/audio/scene.mp3"}}}}"#,
                server.uri()
            ),
            "application/json",
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/audio/scene.mp3"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 16]))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/users/children/me"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"success":true,"data":{"id":4,"name":"Mina"}}"#,
            "application/json",
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/stories/10/intro-question"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"success":true,"data":{"session_id":"abc","current_stage":"S1","audio_url":"missing.mp3","text_content":"Hello"}}"#,
            "application/json",
        ))
        .mount(server)
        .await;
}

fn screen(server: &MockServer) -> ConversationScreen {
    let cfg = ApiConfig::new(server.uri());
    let auth = ClientAuth::with_token("tok");
    let playback = Arc::new(PlaybackController::new());
    ConversationScreen::with_collaborators(
        StoryId::new(10),
        Arc::new(HttpTurnExchange::new(cfg.clone(), auth.clone())),
        Arc::new(HttpStoryGateway::new(cfg.clone(), auth.clone())),
        Arc::new(HttpChildDirectory::new(cfg, auth)),
        Arc::new(FakeMic),
        Arc::new(SpeakerBridge::new(playback)),
    )
}

#[tokio::test]
async fn conversation_flow_from_intro_to_card() {
    let server = MockServer::start().await;
    mount_conversation_endpoints(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/conversations/turn"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"success":true,"data":{"ai_text":"Bye","is_end":true}}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/stories/10/action-card"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"success":true,"data":{"title":"Count to ten","situation_content":"s","action_content":"a","img_url":"card.png"}}"#,
            "application/json",
        ))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/api/conversations/abc/fail"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut screen = screen(&server);

    screen.enter().await.unwrap();
    screen.replay_prompt();

    screen.start_dialogue().await.unwrap();
    assert_eq!(screen.machine().session_id().unwrap().as_str(), "abc");

    screen.press_mic().await.unwrap();
    let outcome = screen.release_mic().await.unwrap();
    assert_eq!(outcome, TurnOutcome::Finished);
    assert_eq!(screen.machine().screen(), ScreenStage::Card);

    // Card is cached: the second read must not re-fetch.
    let first = screen.action_card().await.unwrap();
    let second = screen.action_card().await.unwrap();
    assert_eq!(first, second);

    // Completed session: teardown must stay silent (expect(0) verifies).
    screen.dispose();
    tokio::time::sleep(Duration::from_millis(100)).await;
}

#[tokio::test]
async fn abandoning_the_dialogue_notifies_the_server_once() {
    let server = MockServer::start().await;
    mount_conversation_endpoints(&server).await;

    Mock::given(method("PATCH"))
        .and(path("/api/conversations/abc/fail"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(r#"{"success":true,"data":null}"#, "application/json"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut screen = screen(&server);
    screen.enter().await.unwrap();
    screen.start_dialogue().await.unwrap();

    // Navigation away mid-dialogue; drop follows dispose and must not
    // produce a second notification.
    screen.dispose();
    drop(screen);

    let mut seen = 0;
    for _ in 0..50 {
        seen = server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|r| r.url.path() == "/api/conversations/abc/fail")
            .count();
        if seen >= 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(seen, 1);
}

#[tokio::test]
async fn reading_screen_saves_on_exit_but_not_after_finishing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/stories/3/children/8/pages"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"success":true,"data":{"child_id":8,"story_id":3,"page_number":5,"is_end":false}}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/api/stories/3/children/8/pages"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(r#"{"success":true,"data":null}"#, "application/json"),
        )
        .mount(&server)
        .await;

    let store = Arc::new(HttpProgressStore::new(
        ApiConfig::new(server.uri()),
        ClientAuth::with_token("tok"),
    ));

    // Abandoned mid-story: unmount fires one exit-safe partial save.
    {
        let mut screen = ReadingScreen::new(StoryId::new(3), ChildId::new(8), 20, store.clone());
        assert_eq!(screen.enter().await, 5);
        screen.open_page(6, None).await;
        screen.dispose();
    }

    let mut partial_saves = 0;
    for _ in 0..50 {
        partial_saves = server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|r| r.method.as_str() == "PATCH")
            .count();
        if partial_saves >= 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    // One awaited save for the page turn, one exit-safe save on dispose.
    assert_eq!(partial_saves, 2);

    server.reset().await;

    Mock::given(method("GET"))
        .and(path("/api/stories/3/children/8/pages"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"success":true,"data":{"child_id":8,"story_id":3,"page_number":0,"is_end":false}}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/api/stories/3/children/8/pages"))
        .and(body_string_contains("\"is_end\":true"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(r#"{"success":true,"data":null}"#, "application/json"),
        )
        .expect(1)
        .mount(&server)
        .await;

    // Finished story: the completion save is the only PATCH; the exit saves
    // on hide and dispose are suppressed (the is_end matcher above would
    // reject a partial save, and expect(1) pins the count).
    {
        let mut screen = ReadingScreen::new(StoryId::new(3), ChildId::new(8), 20, store.clone());
        screen.enter().await;
        screen.finish_reading().await.unwrap();
        screen.on_hidden();
        screen.dispose();
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
}
