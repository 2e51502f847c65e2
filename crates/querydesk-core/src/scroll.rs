//! Follow-bottom scroll state for a live-growing transcript.
//!
//! The controller has no viewport of its own; the presentation layer reports
//! scroll positions in and drains deferred scroll requests out on its next
//! tick, once layout has settled.

/// Distance from the maximum offset still treated as "at the bottom".
const BOTTOM_TOLERANCE: f64 = 8.0;

/// Tracks whether the viewport is pinned to the latest message.
///
/// Pinned initially and whenever the reported position is within
/// [`BOTTOM_TOLERANCE`] of the maximum offset; unpinned the instant the user
/// scrolls away. While pinned, transcript growth schedules one deferred
/// scroll-to-bottom per batch, drained by [`ScrollFollower::take_pending_scroll`].
#[derive(Debug, Clone)]
pub struct ScrollFollower {
    pinned_to_bottom: bool,
    pending_scroll: bool,
    last_offset: f64,
    last_max_offset: f64,
}

impl ScrollFollower {
    pub fn new() -> Self {
        Self {
            pinned_to_bottom: true,
            pending_scroll: false,
            last_offset: 0.0,
            last_max_offset: 0.0,
        }
    }

    pub fn pinned_to_bottom(&self) -> bool {
        self.pinned_to_bottom
    }

    /// Records the viewport position reported by the presentation layer.
    ///
    /// `offset` is the scroll position measured from the top, `max_offset`
    /// the maximum reachable position (0 when the content fits the view).
    pub fn observe_viewport(&mut self, offset: f64, max_offset: f64) {
        self.last_offset = offset;
        self.last_max_offset = max_offset;

        if max_offset <= 0.0 {
            self.pinned_to_bottom = true;
            return;
        }

        self.pinned_to_bottom = max_offset - offset <= BOTTOM_TOLERANCE;
    }

    /// Called on any transcript growth (new turn or streamed delta batch).
    ///
    /// Idempotent within a batch: however many deltas arrive before the next
    /// tick, at most one deferred scroll is scheduled.
    pub fn notify_content_grown(&mut self) {
        if self.pinned_to_bottom {
            self.pending_scroll = true;
        }
    }

    /// Called when a generation finishes, so the settled layout gets a final
    /// scroll into view.
    pub fn notify_generation_finished(&mut self) {
        if self.pinned_to_bottom {
            self.pending_scroll = true;
        }
    }

    /// Drains the deferred scroll request. The caller invokes this on its
    /// next tick and scrolls to the bottom when it returns true.
    pub fn take_pending_scroll(&mut self) -> bool {
        std::mem::take(&mut self.pending_scroll)
    }

    /// Explicit "jump to latest" affordance: re-pins and schedules a scroll.
    pub fn jump_to_latest(&mut self) {
        self.pinned_to_bottom = true;
        self.pending_scroll = true;
    }

    /// Returns to the initial pinned state with a scroll scheduled, used
    /// when the visible conversation changes.
    pub fn reset(&mut self) {
        self.pinned_to_bottom = true;
        self.pending_scroll = true;
        self.last_offset = 0.0;
        self.last_max_offset = 0.0;
    }
}

impl Default for ScrollFollower {
    fn default() -> Self {
        Self::new()
    }
}
