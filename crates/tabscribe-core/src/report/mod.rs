use crate::check::Progress;

pub mod console;

/// What one pass over a unit of work did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitReport {
    pub dataset: String,
    pub unit: String,
    pub rows: usize,
    /// Indices selected by the consistency check at the start of the pass.
    pub scheduled: usize,
    pub completed: usize,
    pub skipped: usize,
    /// Left pending because the retry budget ran out.
    pub deferred: usize,
    pub cancelled: bool,
    /// State of the unit after the pass.
    pub progress: Progress,
    pub duration_ms: u64,
}

impl UnitReport {
    pub fn is_complete(&self) -> bool {
        self.progress.pending == 0
    }
}
