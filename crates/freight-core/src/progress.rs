/// Trait for reporting per-candidate progress of a batch run.
///
/// CLI implements with indicatif. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_batch_start(&self, _total: usize) {}
    fn on_candidate_start(&self, _index: usize, _name: &str) {}
    fn on_candidate_skipped(&self, _index: usize, _name: &str, _reason: &str) {}
    fn on_candidate_success(&self, _index: usize, _name: &str) {}
    fn on_candidate_failure(&self, _index: usize, _name: &str, _message: &str) {}
    fn on_batch_complete(&self) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
