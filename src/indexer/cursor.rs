use super::types::EventKind;

/// A block window that has been opened but not yet fully handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWindow {
    pub from_block: u64,
    pub to_block: u64,
    completed: Vec<EventKind>,
}

/// Watermark of the last fully processed block.
///
/// Only moves forward, and only once every tracked kind in the open window
/// has been fetched and handed downstream. A window that fails part-way is
/// kept frozen, with the kinds already handled, so that a retry covers the
/// same range and skips what was already delivered.
#[derive(Debug, Clone)]
pub struct BlockCursor {
    last_checked_block: u64,
    pending: Option<PendingWindow>,
}

impl BlockCursor {
    pub fn new(start_block: u64) -> Self {
        Self {
            last_checked_block: start_block,
            pending: None,
        }
    }

    pub fn last_checked_block(&self) -> u64 {
        self.last_checked_block
    }

    pub fn pending(&self) -> Option<&PendingWindow> {
        self.pending.as_ref()
    }

    /// Window to scan given the current head, capped at `max_range` blocks.
    /// Returns the frozen window while one is pending.
    pub fn next_window(&mut self, head: u64, max_range: u64) -> Option<(u64, u64)> {
        if let Some(window) = &self.pending {
            return Some((window.from_block, window.to_block));
        }
        if head <= self.last_checked_block {
            return None;
        }

        let from_block = self.last_checked_block + 1;
        let to_block = head.min(self.last_checked_block.saturating_add(max_range));
        self.pending = Some(PendingWindow {
            from_block,
            to_block,
            completed: Vec::new(),
        });
        Some((from_block, to_block))
    }

    pub fn is_completed(&self, kind: EventKind) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|w| w.completed.contains(&kind))
    }

    pub fn mark_completed(&mut self, kind: EventKind) {
        if let Some(window) = &mut self.pending {
            if !window.completed.contains(&kind) {
                window.completed.push(kind);
            }
        }
    }

    /// Close the pending window once every kind has been handled.
    /// Returns the new watermark, or `None` if the window is incomplete.
    pub fn advance(&mut self) -> Option<u64> {
        let window = self.pending.as_ref()?;
        if !EventKind::ALL.iter().all(|k| window.completed.contains(k)) {
            return None;
        }
        self.last_checked_block = window.to_block;
        self.pending = None;
        Some(self.last_checked_block)
    }
}
