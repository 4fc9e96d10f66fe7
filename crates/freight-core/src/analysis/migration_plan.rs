use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::aggregate::Inventory;
use crate::error::Error;
use crate::progress::ProgressReporter;
use crate::scheduler::CandidateFailure;
use crate::tools::{path_args, Tool, ToolRunner};

/// One candidate scheduled for transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMigration {
    pub name: String,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub size_bytes: u64,
    pub file_count: u64,
}

/// Scanned candidates in ascending size order, with resolved destinations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPlan {
    pub migration_root: PathBuf,
    pub dest_path: PathBuf,
    pub entries: Vec<PlannedMigration>,
}

impl MigrationPlan {
    /// Only candidates with scan data are planned. Equal sizes keep their
    /// name order.
    pub fn build(inventory: &Inventory, dest_path: Option<&Path>) -> Result<Self, Error> {
        let mut scanned: Vec<_> = inventory.scanned().collect();
        if scanned.is_empty() {
            return Err(Error::NoScanData);
        }
        let dest_path = dest_path.ok_or(Error::DestinationNotConfigured)?;

        scanned.sort_by_key(|c| c.size_bytes());

        let entries = scanned
            .into_iter()
            .map(|c| PlannedMigration {
                name: c.name.clone(),
                source: c.path.clone(),
                destination: dest_path.join(&c.name),
                size_bytes: c.size_bytes(),
                file_count: c.file_count(),
            })
            .collect();

        Ok(Self {
            migration_root: inventory.root().to_path_buf(),
            dest_path: dest_path.to_path_buf(),
            entries,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_size(&self) -> u64 {
        self.entries.iter().map(|e| e.size_bytes).sum()
    }

    pub fn total_files(&self) -> u64 {
        self.entries.iter().map(|e| e.file_count).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MigrationMode {
    #[default]
    DryRun,
    Confirmed,
}

/// Per-candidate results of an executed plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationOutcome {
    pub total: usize,
    pub succeeded: Vec<String>,
    pub failed: Vec<CandidateFailure>,
}

impl MigrationOutcome {
    pub fn successful(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failed_names(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.name.as_str()).collect()
    }
}

/// Where a migration run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationRun {
    /// Dry run: the plan was produced and nothing was transferred.
    Planned(MigrationPlan),
    /// The operator declined the confirmation prompt.
    Declined(MigrationPlan),
    Executed(MigrationPlan, MigrationOutcome),
}

/// Drive a plan through dry-run or confirmation and execution.
///
/// `confirm` is only consulted in [`MigrationMode::Confirmed`].
pub fn run_migration<R, F>(
    plan: MigrationPlan,
    mode: MigrationMode,
    confirm: F,
    runner: &R,
    reporter: &dyn ProgressReporter,
) -> Result<MigrationRun, Error>
where
    R: ToolRunner + ?Sized,
    F: FnOnce(&MigrationPlan) -> io::Result<bool>,
{
    if mode == MigrationMode::DryRun {
        info!("Dry run: {} directories planned, nothing transferred", plan.len());
        return Ok(MigrationRun::Planned(plan));
    }

    if !confirm(&plan)? {
        info!("Migration declined by operator");
        return Ok(MigrationRun::Declined(plan));
    }

    let outcome = execute_migration_plan(&plan, runner, reporter);
    Ok(MigrationRun::Executed(plan, outcome))
}

/// Transfer every planned candidate in order. A failure is recorded and the
/// next candidate is still attempted.
pub fn execute_migration_plan<R>(
    plan: &MigrationPlan,
    runner: &R,
    reporter: &dyn ProgressReporter,
) -> MigrationOutcome
where
    R: ToolRunner + ?Sized,
{
    let mut outcome = MigrationOutcome {
        total: plan.len(),
        ..MigrationOutcome::default()
    };
    reporter.on_batch_start(plan.len());

    for (i, entry) in plan.entries.iter().enumerate() {
        let index = i + 1;
        reporter.on_candidate_start(index, &entry.name);

        let args = path_args(&[
            entry.source.as_path(),
            entry.destination.as_path(),
            plan.migration_root.as_path(),
        ]);
        let failure = match runner.execute(Tool::Migrate, &args) {
            Ok(output) if output.success => None,
            Ok(output) => Some(output.diagnostic()),
            Err(e) => Some(format!("failed to start: {}", e)),
        };

        match failure {
            None => {
                reporter.on_candidate_success(index, &entry.name);
                outcome.succeeded.push(entry.name.clone());
            }
            Some(message) => {
                error!("Migration of {} failed: {}", entry.source.display(), message);
                reporter.on_candidate_failure(index, &entry.name, &message);
                outcome.failed.push(CandidateFailure {
                    name: entry.name.clone(),
                    message,
                });
            }
        }
    }

    reporter.on_batch_complete();
    if outcome.failed.is_empty() {
        info!("Migration complete: {} directories", outcome.successful());
    } else {
        warn!(
            "Migration finished: {} succeeded, {} failed",
            outcome.successful(),
            outcome.failed.len()
        );
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Candidate;
    use crate::storage::ScanRecord;

    fn candidate(name: &str, size: Option<u64>) -> Candidate {
        Candidate {
            name: name.to_string(),
            path: PathBuf::from("/src").join(name),
            scan: size.map(|size_bytes| ScanRecord {
                size_bytes,
                file_count: 1,
                ..ScanRecord::default()
            }),
            clean: None,
        }
    }

    fn inventory(candidates: Vec<Candidate>) -> Inventory {
        Inventory::from_candidates(Path::new("/src"), candidates)
    }

    #[test]
    fn test_plan_orders_ascending_by_size() {
        let inv = inventory(vec![
            candidate("a", Some(50)),
            candidate("b", Some(10)),
            candidate("c", Some(30)),
        ]);
        let plan = MigrationPlan::build(&inv, Some(Path::new("/dst"))).unwrap();
        let sizes: Vec<u64> = plan.entries.iter().map(|e| e.size_bytes).collect();
        assert_eq!(sizes, vec![10, 30, 50]);
        assert_eq!(plan.entries[0].destination, PathBuf::from("/dst/b"));
        assert_eq!(plan.total_size(), 90);
        assert_eq!(plan.total_files(), 3);
    }

    #[test]
    fn test_plan_equal_sizes_keep_name_order() {
        let inv = inventory(vec![
            candidate("zed", Some(5)),
            candidate("amy", Some(5)),
            candidate("big", Some(9)),
        ]);
        let plan = MigrationPlan::build(&inv, Some(Path::new("/dst"))).unwrap();
        let names: Vec<&str> = plan.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["amy", "zed", "big"]);
    }

    #[test]
    fn test_plan_skips_unscanned() {
        let inv = inventory(vec![candidate("a", Some(1)), candidate("b", None)]);
        let plan = MigrationPlan::build(&inv, Some(Path::new("/dst"))).unwrap();
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn test_plan_requires_scan_data() {
        let inv = inventory(vec![candidate("a", None)]);
        assert!(matches!(
            MigrationPlan::build(&inv, Some(Path::new("/dst"))),
            Err(Error::NoScanData)
        ));
    }

    #[test]
    fn test_plan_requires_destination() {
        let inv = inventory(vec![candidate("a", Some(1))]);
        assert!(matches!(
            MigrationPlan::build(&inv, None),
            Err(Error::DestinationNotConfigured)
        ));
    }
}
