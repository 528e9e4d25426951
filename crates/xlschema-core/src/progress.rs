/// Trait for reporting progress through a synchronisation or materialisation run.
///
/// The CLI implements it with indicatif; all methods default to no-ops.
pub trait ProgressReporter: Send + Sync {
    fn on_phase_start(&self, _phase: Phase, _total_files: usize) {}
    fn on_file_start(&self, _relative_path: &str) {}
    fn on_file_done(&self, _relative_path: &str, _outcome: FileOutcome) {}
    fn on_phase_complete(&self, _phase: Phase, _duration_secs: f64) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Fingerprint,
    Schema,
    Data,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Fingerprint => "Fingerprinting",
            Phase::Schema => "Building schema",
            Phase::Data => "Extracting data",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    Added,
    Updated,
    Unchanged,
    Skipped,
    Extracted { records: usize },
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
