use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::{debug, error, info};

use crate::progress::ProgressReporter;
use crate::storage::artifacts::{self, ArtifactLoad};
use crate::storage::ScanRecord;
use crate::tools::{path_args, Tool, ToolRunner};

/// Whether a candidate needs an external scan, with the reason shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanDecision {
    Skip { reason: String },
    Scan { reason: String },
}

impl ScanDecision {
    pub fn should_skip(&self) -> bool {
        matches!(self, ScanDecision::Skip { .. })
    }

    pub fn reason(&self) -> &str {
        match self {
            ScanDecision::Skip { reason } | ScanDecision::Scan { reason } => reason,
        }
    }
}

/// Skip iff the directory has not been modified since the recorded scan.
pub fn decide(current_mtime: i64, previous: &ArtifactLoad<ScanRecord>) -> ScanDecision {
    match previous {
        ArtifactLoad::Missing => ScanDecision::Scan {
            reason: "no previous scan".to_string(),
        },
        ArtifactLoad::Degraded(reason) => ScanDecision::Scan {
            reason: format!("scan data invalid: {}", reason),
        },
        ArtifactLoad::Loaded(ScanRecord {
            mtime_error: Some(reason),
            ..
        }) => ScanDecision::Scan {
            reason: format!("scan data invalid: {}", reason),
        },
        ArtifactLoad::Loaded(record) => match record.directory_mtime {
            None => ScanDecision::Scan {
                reason: "no mtime in scan data".to_string(),
            },
            Some(recorded) if current_mtime <= recorded => ScanDecision::Skip {
                reason: "no changes".to_string(),
            },
            Some(_) => ScanDecision::Scan {
                reason: "directory modified".to_string(),
            },
        },
    }
}

/// Read the directory's mtime and its scan artifact, then [`decide`].
pub fn scan_decision(dir: &Path) -> ScanDecision {
    let previous = artifacts::load_scan_record(dir);
    if previous == ArtifactLoad::Missing {
        return decide(0, &previous);
    }
    match directory_mtime(dir) {
        Ok(mtime) => decide(mtime, &previous),
        Err(e) => ScanDecision::Scan {
            reason: format!("scan data invalid: {}", e),
        },
    }
}

pub fn directory_mtime(dir: &Path) -> std::io::Result<i64> {
    let modified = fs::metadata(dir)?.modified()?;
    let secs = match modified.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(e) => -(e.duration().as_secs() as i64),
    };
    Ok(secs)
}

/// A candidate whose external invocation failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFailure {
    pub name: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub total: usize,
    pub successful: usize,
    pub skipped: usize,
    pub failed: Vec<CandidateFailure>,
}

impl ScanSummary {
    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanRun {
    /// The root has no candidate directories; nothing was invoked.
    NoSubdirectories,
    Completed(ScanSummary),
}

/// Sequentially scan every candidate that changed since its last scan.
///
/// A failed invocation is recorded and the batch moves on.
pub fn run_incremental_scan<R>(
    candidates: &[PathBuf],
    runner: &R,
    reporter: &dyn ProgressReporter,
) -> ScanRun
where
    R: ToolRunner + ?Sized,
{
    if candidates.is_empty() {
        info!("No subdirectories to scan");
        return ScanRun::NoSubdirectories;
    }

    let mut summary = ScanSummary {
        total: candidates.len(),
        ..ScanSummary::default()
    };
    reporter.on_batch_start(candidates.len());

    for (i, dir) in candidates.iter().enumerate() {
        let index = i + 1;
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let decision = scan_decision(dir);
        if decision.should_skip() {
            debug!("Skipping scan of {} ({})", name, decision.reason());
            reporter.on_candidate_skipped(index, &name, decision.reason());
            summary.skipped += 1;
            continue;
        }

        debug!("Scanning {} ({})", name, decision.reason());
        reporter.on_candidate_start(index, &name);

        let message = match runner.execute(Tool::Scan, &path_args(&[dir.as_path()])) {
            Ok(output) if output.success => None,
            Ok(output) => Some(output.diagnostic()),
            Err(e) => Some(e.to_string()),
        };

        match message {
            None => {
                reporter.on_candidate_success(index, &name);
                summary.successful += 1;
            }
            Some(message) => {
                error!("Scan of {} failed: {}", dir.display(), message);
                reporter.on_candidate_failure(index, &name, &message);
                summary.failed.push(CandidateFailure { name, message });
            }
        }
    }

    reporter.on_batch_complete();
    info!(
        "Scan finished: {} successful, {} skipped, {} failed",
        summary.successful,
        summary.skipped,
        summary.failed_count()
    );
    ScanRun::Completed(summary)
}
