//! Load summary and reporting
//!
//! Aggregates what a pipeline run read, built and loaded.

use super::outcome::LoadOutcome;
use serde::Serialize;
use std::time::Duration;

/// Summary of a pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct LoadSummary {
    /// Locators handed to the parser
    pub locators: usize,

    /// Containers parsed successfully
    pub containers_read: usize,

    /// Locators whose containers were all rejected by selectors or failed to parse
    pub rejected_locators: Vec<String>,

    /// Documents produced by reshaping
    pub documents_built: usize,

    /// Documents confirmed by the store
    pub documents_loaded: usize,

    /// Documents that failed to load
    pub documents_failed: usize,

    /// Replace-mode duplicates dropped before loading
    pub documents_superseded: usize,

    /// Documents whose read-back differed from the input
    pub read_back_mismatches: usize,

    /// Slice unit-cardinality violations
    pub cardinality_violations: usize,

    /// Whether the store was left untouched
    pub dry_run: bool,

    /// Overall loader verdict
    pub load_success: bool,

    /// Duration of the run
    #[serde(with = "duration_secs")]
    pub duration: Duration,

    /// Errors encountered
    pub errors: Vec<String>,
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }
}

impl LoadSummary {
    /// Create a new empty summary
    pub fn new() -> Self {
        Self {
            locators: 0,
            containers_read: 0,
            rejected_locators: Vec::new(),
            documents_built: 0,
            documents_loaded: 0,
            documents_failed: 0,
            documents_superseded: 0,
            read_back_mismatches: 0,
            cardinality_violations: 0,
            dry_run: false,
            load_success: true,
            duration: Duration::from_secs(0),
            errors: Vec::new(),
        }
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Fold a loader outcome into the summary
    pub fn record_outcome(&mut self, outcome: &LoadOutcome) {
        self.documents_loaded += outcome.success_list.len();
        self.documents_failed += outcome.fail_list.len();
        self.documents_superseded += outcome.superseded.len();
        self.read_back_mismatches += outcome.read_back_mismatches.len();
        self.load_success &= outcome.success;
        self.errors.extend(outcome.errors.iter().cloned());
    }

    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    /// Check if the run was successful (no failures)
    pub fn is_successful(&self) -> bool {
        self.load_success && self.documents_failed == 0 && self.errors.is_empty()
    }

    /// Get success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        let attempted = self.documents_loaded + self.documents_failed;
        if attempted == 0 {
            return 100.0;
        }
        (self.documents_loaded as f64 / attempted as f64) * 100.0
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            locators = self.locators,
            containers = self.containers_read,
            rejected = self.rejected_locators.len(),
            documents = self.documents_built,
            loaded = self.documents_loaded,
            failed = self.documents_failed,
            superseded = self.documents_superseded,
            dry_run = self.dry_run,
            duration_secs = self.duration.as_secs(),
            success_rate = format!("{:.2}%", self.success_rate()),
            "Load completed"
        );

        if self.cardinality_violations > 0 {
            tracing::warn!(
                violations = self.cardinality_violations,
                "Slice unit-cardinality violations"
            );
        }
        if !self.errors.is_empty() {
            tracing::warn!(error_count = self.errors.len(), "Load completed with errors");
            for error in &self.errors {
                tracing::warn!(message = %error, "Load error");
            }
        }
    }
}

impl Default for LoadSummary {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_rate() {
        let mut summary = LoadSummary::new();
        assert_eq!(summary.success_rate(), 100.0);

        let mut outcome = LoadOutcome::new();
        (0..3).for_each(|i| outcome.add_success(i));
        outcome.add_failure(3);
        summary.record_outcome(&outcome);

        assert_eq!(summary.success_rate(), 75.0);
        assert!(!summary.is_successful());
    }

    #[test]
    fn test_serializes_duration_as_seconds() {
        let summary = LoadSummary::new().with_duration(Duration::from_millis(1500));
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["duration"], 1.5);
    }
}
