//! Pagination window over a projected collection

use serde::Serialize;
use std::num::NonZeroUsize;

/// Where a window stands relative to the projected total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowState {
    /// Nothing passes the filter
    Empty,
    /// More items exist beyond the window
    Partial,
    /// The window shows every projected item
    Complete,
}

/// Result of asking the window to grow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowStep {
    /// The window grew from `from` to `to` items
    Advanced { from: usize, to: usize },
    /// Nothing to load; the window was `Empty` or `Complete`
    NoOp(WindowState),
}

/// The prefix of the projected collection exposed to the view
///
/// Invariant: `current_count <= total` after every operation that is given the
/// current total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    page_size: NonZeroUsize,
    current_count: usize,
}

impl PageWindow {
    /// Create an empty window
    pub fn new(page_size: NonZeroUsize) -> Self {
        Self {
            page_size,
            current_count: 0,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size.get()
    }

    pub fn current_count(&self) -> usize {
        self.current_count
    }

    pub fn state(&self, total: usize) -> WindowState {
        if total == 0 {
            WindowState::Empty
        } else if self.current_count < total {
            WindowState::Partial
        } else {
            WindowState::Complete
        }
    }

    pub fn has_more(&self, total: usize) -> bool {
        self.current_count < total
    }

    /// Restart from the first page (new query)
    pub fn reset(&mut self, total: usize) {
        self.current_count = self.page_size().min(total);
    }

    /// Grow by one page, clamped to `total`
    pub fn request_more(&mut self, total: usize) -> WindowStep {
        match self.state(total) {
            WindowState::Partial => {
                let from = self.current_count;
                self.current_count = from.saturating_add(self.page_size()).min(total);
                WindowStep::Advanced {
                    from,
                    to: self.current_count,
                }
            }
            state => WindowStep::NoOp(state),
        }
    }

    /// Shrink to `new_total` if needed; never grows the window
    pub fn clamp_after_mutation(&mut self, new_total: usize) {
        self.current_count = self.current_count.min(new_total);
    }
}
