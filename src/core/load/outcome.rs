//! Per-load success and failure accounting

use serde::Serialize;

/// Result of one bulk load
///
/// Lists hold indices into the (possibly limited) input document list, sorted
/// ascending. `success` is the conjunction of every chunk outcome and the
/// read-back check; it can be false while `fail_list` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadOutcome {
    pub success: bool,
    pub success_list: Vec<usize>,
    pub fail_list: Vec<usize>,
    /// Replace-mode duplicates dropped in favour of a later document with the same key
    pub superseded: Vec<usize>,
    /// Documents whose stored copy differed from the inserted one
    pub read_back_mismatches: Vec<usize>,
    /// Errors caught at chunk boundaries
    pub errors: Vec<String>,
}

impl LoadOutcome {
    /// Create an empty, successful outcome
    pub fn new() -> Self {
        Self {
            success: true,
            success_list: Vec::new(),
            fail_list: Vec::new(),
            superseded: Vec::new(),
            read_back_mismatches: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// An outcome where every listed document failed for the same reason
    pub fn failed(indices: impl IntoIterator<Item = usize>, error: impl Into<String>) -> Self {
        let mut outcome = Self::new();
        outcome.success = false;
        outcome.fail_list.extend(indices);
        outcome.errors.push(error.into());
        outcome
    }

    pub fn add_success(&mut self, index: usize) {
        self.success_list.push(index);
    }

    pub fn add_failure(&mut self, index: usize) {
        self.success = false;
        self.fail_list.push(index);
    }

    /// Record a read-back mismatch; the document stays in the success list
    pub fn add_read_back_mismatch(&mut self, index: usize) {
        self.success = false;
        self.read_back_mismatches.push(index);
    }

    pub fn add_error(&mut self, error: impl Into<String>) {
        self.success = false;
        self.errors.push(error.into());
    }

    /// Merge another outcome into this one
    pub fn merge(&mut self, other: LoadOutcome) {
        self.success &= other.success;
        self.success_list.extend(other.success_list);
        self.fail_list.extend(other.fail_list);
        self.superseded.extend(other.superseded);
        self.read_back_mismatches.extend(other.read_back_mismatches);
        self.errors.extend(other.errors);
    }

    /// Sort all index lists; chunk results arrive in completion order
    pub fn finalize(mut self) -> Self {
        self.success_list.sort_unstable();
        self.fail_list.sort_unstable();
        self.superseded.sort_unstable();
        self.read_back_mismatches.sort_unstable();
        self
    }

    /// Number of documents attempted (successes plus failures)
    pub fn attempted(&self) -> usize {
        self.success_list.len() + self.fail_list.len()
    }
}

impl Default for LoadOutcome {
    fn default() -> Self {
        Self::new()
    }
}
