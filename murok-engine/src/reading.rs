use crate::traits::ProgressStore;
use murok_core::progress::{ReadingProgress, clamp_page, last_content_page};
use murok_core::types::{ChildId, StoryId};
use std::sync::Arc;

/// Why the reading screen is going away (or out of sight).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitTrigger {
    /// Page/tab hidden or closing.
    Hidden,
    /// Screen unmounted (navigation).
    Unmounted,
    /// Application lost foreground.
    Backgrounded,
}

/// Tracks how far a child has read and keeps the remote record current.
///
/// Shares the conversation flow's exit-event taxonomy: every teardown path
/// funnels into `handle_exit`, and the completion flag set by `finish`
/// suppresses exit saves so a lower page number can never race over the
/// authoritative `is_end` record.
pub struct ReadingProgressTracker {
    story_id: StoryId,
    child_id: ChildId,
    total_pages: u32,
    page: u32,
    completed: bool,
    store: Arc<dyn ProgressStore>,
}

impl ReadingProgressTracker {
    pub fn new(
        story_id: StoryId,
        child_id: ChildId,
        total_pages: u32,
        store: Arc<dyn ProgressStore>,
    ) -> Self {
        Self {
            story_id,
            child_id,
            total_pages,
            page: 0,
            completed: false,
            store,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Restore the last-read position. A failed lookup starts from the
    /// cover; resuming is a convenience, not a requirement.
    pub async fn resume(&mut self) -> u32 {
        match self.store.last_read_page(self.story_id, self.child_id).await {
            Ok(page) => self.page = clamp_page(page, self.total_pages),
            Err(e) => log::warn!("last-read lookup failed, starting from cover: {e}"),
        }
        self.page
    }

    /// Explicit page turn: remember and save, awaited.
    pub async fn page_turned(&mut self, page: u32) -> anyhow::Result<()> {
        self.page = clamp_page(page, self.total_pages);
        let progress = ReadingProgress::partial(self.story_id, self.child_id, self.page);
        self.store.save(&progress).await
    }

    /// The child finished the story. The completion flag is set before the
    /// network call starts so an exit during (or after) the save can never
    /// push a partial record over the final one.
    pub async fn finish(&mut self) -> anyhow::Result<()> {
        if self.completed {
            return Ok(());
        }
        self.completed = true;
        self.page = last_content_page(self.total_pages);
        let progress = ReadingProgress::finished(self.story_id, self.child_id, self.page);
        self.store.save(&progress).await
    }

    /// Exit-safe save. Values are captured into the record here,
    /// synchronously, before any teardown can clear them; delivery is
    /// fire-and-forget. Suppressed after completion, and skipped while the
    /// child is still on the cover (nothing read, nothing to record).
    pub fn handle_exit(&self, trigger: ExitTrigger) {
        if self.completed {
            log::debug!("exit save suppressed ({trigger:?}): already completed");
            return;
        }
        if self.page == 0 {
            return;
        }

        let progress = ReadingProgress::partial(self.story_id, self.child_id, self.page);
        log::debug!("exit save ({trigger:?}): page {}", progress.page_number);
        self.store.save_on_exit(&progress);
    }
}
