//
// Adapters from the engine's audio seams to the concrete device controllers.

use async_trait::async_trait;
use murok_audio::{AudioSlot, CaptureController, PlaybackController};
use murok_engine::traits::{PlaybackSlot, RecordedClip, SpeechOutput, VoiceCapture};
use std::sync::Arc;

fn slot(slot: PlaybackSlot) -> AudioSlot {
    match slot {
        PlaybackSlot::Prompt => AudioSlot::Prompt,
        PlaybackSlot::Reply => AudioSlot::Reply,
    }
}

/// Microphone seam over the cpal capture controller.
pub struct MicBridge {
    controller: tokio::sync::Mutex<CaptureController>,
}

impl MicBridge {
    pub fn new() -> Self {
        Self {
            controller: tokio::sync::Mutex::new(CaptureController::new()),
        }
    }
}

impl Default for MicBridge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VoiceCapture for MicBridge {
    async fn start(&self) -> anyhow::Result<()> {
        let mut controller = self.controller.lock().await;
        controller.start()?;
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<Option<RecordedClip>> {
        let mut controller = self.controller.lock().await;
        let clip = controller.stop()?;
        Ok(clip.map(|c| RecordedClip {
            bytes: c.bytes,
            mime_type: c.mime_type,
        }))
    }
}

/// Speaker seam over the rodio playback controller: downloads the clip the
/// server referenced, then resolves when it has actually finished playing.
pub struct SpeakerBridge {
    playback: Arc<PlaybackController>,
}

impl SpeakerBridge {
    pub fn new(playback: Arc<PlaybackController>) -> Self {
        Self { playback }
    }
}

#[async_trait]
impl SpeechOutput for SpeakerBridge {
    async fn play_to_end(&self, target: PlaybackSlot, url: &str) -> anyhow::Result<()> {
        let bytes = match murok_providers::runtime::fetch_bytes(url).await {
            Ok(b) => b,
            Err(e) => {
                // Retryable via replay; a missing clip must not wedge the turn.
                log::warn!("audio clip download failed: {e}");
                return Ok(());
            }
        };

        let target = slot(target);
        self.playback.set_clip(target, bytes, true);

        let playback = self.playback.clone();
        tokio::task::spawn_blocking(move || playback.wait_until_finished(target))
            .await
            .map_err(|e| anyhow::anyhow!("playback watcher failed: {e}"))?;
        Ok(())
    }

    fn stop_all(&self) {
        self.playback.clear(AudioSlot::Prompt);
        self.playback.clear(AudioSlot::Reply);
    }
}
