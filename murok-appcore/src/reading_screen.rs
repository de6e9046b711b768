use murok_audio::{AudioSlot, PlaybackController};
use murok_core::types::{ChildId, StoryId};
use murok_engine::reading::{ExitTrigger, ReadingProgressTracker};
use murok_engine::traits::ProgressStore;
use std::sync::Arc;

/// One mounted story-reading screen: page narration plus the shared
/// exit-safe progress contract.
///
/// Exit taxonomy (mirrors the conversation screen's lifecycle events):
/// hidden and backgrounding fire an exit-safe save and pause narration;
/// disposal fires the final one. Completion, recorded synchronously in
/// `finish_reading`, suppresses all of them.
pub struct ReadingScreen {
    tracker: ReadingProgressTracker,
    playback: Arc<PlaybackController>,
    disposed: bool,
}

impl ReadingScreen {
    pub fn new(
        story_id: StoryId,
        child_id: ChildId,
        total_pages: u32,
        store: Arc<dyn ProgressStore>,
    ) -> Self {
        Self {
            tracker: ReadingProgressTracker::new(story_id, child_id, total_pages, store),
            playback: Arc::new(PlaybackController::new()),
            disposed: false,
        }
    }

    pub fn tracker(&self) -> &ReadingProgressTracker {
        &self.tracker
    }

    /// Screen mounted: pick up where the child left off.
    pub async fn enter(&mut self) -> u32 {
        self.tracker.resume().await
    }

    /// Page turned: save progress and start this page's narration.
    /// Narration trouble is logged and swallowed; the page still turns.
    pub async fn open_page(&mut self, page: u32, narration_url: Option<&str>) {
        if let Err(e) = self.tracker.page_turned(page).await {
            log::warn!("progress save failed for page {page}: {e}");
        }

        if let Some(url) = narration_url {
            match murok_providers::runtime::fetch_bytes(url).await {
                Ok(bytes) => self.playback.set_clip(AudioSlot::Prompt, bytes, true),
                Err(e) => log::warn!("page narration unavailable: {e}"),
            }
        } else {
            self.playback.clear(AudioSlot::Prompt);
        }
    }

    pub fn replay_narration(&self) {
        self.playback.replay(AudioSlot::Prompt);
    }

    /// "I finished reading": the authoritative completion save.
    pub async fn finish_reading(&mut self) -> anyhow::Result<()> {
        self.tracker.finish().await
    }

    pub fn on_hidden(&self) {
        self.tracker.handle_exit(ExitTrigger::Hidden);
        self.playback.suspend();
    }

    pub fn on_backgrounded(&self) {
        self.tracker.handle_exit(ExitTrigger::Backgrounded);
        self.playback.suspend();
    }

    pub fn on_visible(&self) {
        self.playback.resume();
    }

    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.tracker.handle_exit(ExitTrigger::Unmounted);
        self.playback.clear(AudioSlot::Prompt);
    }
}

impl Drop for ReadingScreen {
    fn drop(&mut self) {
        self.dispose();
    }
}
