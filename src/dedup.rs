//! Per-epoch set of already-emitted raw lines.

use std::collections::HashSet;

/// Exact-text dedup scoped to one cursor epoch.
///
/// Cleared by the tailer whenever the cursor epoch advances. Grows without
/// bound inside an epoch, which is bounded by the file's lifetime.
#[derive(Debug, Default)]
pub struct DedupWindow {
    seen: HashSet<String>,
}

impl DedupWindow {
    /// Create an empty window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` the first time `raw` is offered in this epoch and marks it.
    pub fn should_emit(&mut self, raw: &str) -> bool {
        if self.seen.contains(raw) {
            return false;
        }
        self.seen.insert(raw.to_owned())
    }

    /// Release a mark so the line can be emitted again, e.g. after a failed write.
    pub fn forget(&mut self, raw: &str) {
        self.seen.remove(raw);
    }

    /// Drop every mark when a new epoch starts.
    pub fn clear(&mut self) {
        self.seen.clear();
    }

    /// Number of lines marked in this epoch.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Whether no line has been marked in this epoch.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
