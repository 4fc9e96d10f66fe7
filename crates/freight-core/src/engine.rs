use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::aggregate::{Inventory, OverviewReport, Statistics};
use crate::analysis::migration_plan::{self, MigrationMode, MigrationPlan, MigrationRun};
use crate::analysis::shared_dirs::{self, SharedDirReport};
use crate::config::resolve_path;
use crate::error::Error;
use crate::progress::ProgressReporter;
use crate::scanner;
use crate::scheduler::{self, ScanRun};
use crate::storage::{ConfigStore, Phase, VersionCheck};
use crate::tools::{Tool, ToolOutput, ToolRunner};

/// Coordinates scan, analysis and migration for one migration root.
///
/// Holds the config store explicitly; nothing reads global state.
pub struct Orchestrator<R: ToolRunner> {
    root: PathBuf,
    store: ConfigStore,
    runner: R,
}

impl<R: ToolRunner> Orchestrator<R> {
    /// Resolve the migration root from `root` or, failing that, the config.
    pub fn new(root: Option<&Path>, store: ConfigStore, runner: R) -> Result<Self, Error> {
        let root = match root {
            Some(root) => root.to_path_buf(),
            None => store.migration_root().ok_or(Error::NoMigrationRoot)?,
        };
        let root = resolve_path(&root);
        debug!("Migration root: {}", root.display());
        Ok(Self { root, store, runner })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Create the config skeleton for this root if none exists yet.
    pub fn ensure_global_config(&self) -> Result<bool, Error> {
        self.store.ensure(&self.root, None)
    }

    pub fn check_version(&self) -> VersionCheck {
        self.store.check_version()
    }

    pub fn inventory(&self) -> Result<Inventory, Error> {
        Inventory::collect(&self.root)
    }

    /// Aggregate statistics and write them back to the config.
    pub fn statistics(&self, inventory: &Inventory) -> Result<Statistics, Error> {
        let stats = inventory.statistics();
        self.store.update_stats(&stats)?;
        Ok(stats)
    }

    pub fn overview_report(&self) -> Result<OverviewReport, Error> {
        let inventory = self.inventory()?;
        self.statistics(&inventory)?;
        Ok(inventory.report())
    }

    /// Incremental scan of every candidate whose directory changed.
    pub fn run_scan(&self, reporter: &dyn ProgressReporter) -> Result<ScanRun, Error> {
        self.runner.preflight(Tool::Scan)?;
        let candidates = scanner::list_candidate_dirs(&self.root)?;

        let run = scheduler::run_incremental_scan(&candidates, &self.runner, reporter);
        if let ScanRun::Completed(_) = run {
            self.store.record_phase_time(Phase::Scan)?;
        }
        Ok(run)
    }

    /// Run the clean tool once over the whole root with pass-through args.
    pub fn run_clean(&self, confirm: bool, extra_args: &[String]) -> Result<ToolOutput, Error> {
        self.runner.preflight(Tool::Clean)?;
        scanner::ensure_root(&self.root)?;

        let mut args: Vec<OsString> = vec![self.root.clone().into_os_string()];
        args.extend(extra_args.iter().map(OsString::from));
        if confirm && !extra_args.iter().any(|a| a == "--confirm") {
            args.push(OsString::from("--confirm"));
        }

        info!("Running clean over {}", self.root.display());
        let output = self.runner.execute(Tool::Clean, &args)?;
        if output.success {
            self.store.record_phase_time(Phase::Clean)?;
        } else {
            warn!("Clean failed: {}", output.diagnostic());
        }
        Ok(output)
    }

    pub fn shared_directories(&self, threshold_override: Option<usize>) -> Result<SharedDirReport, Error> {
        let candidates = scanner::list_candidate_dirs(&self.root)?;
        let settings = self.store.shared_dir_settings();
        Ok(shared_dirs::analyze_shared_directories(
            &candidates,
            &settings,
            threshold_override,
        ))
    }

    /// Check preconditions and build the ascending-size plan.
    pub fn plan_migration(&self) -> Result<MigrationPlan, Error> {
        self.runner.preflight(Tool::Migrate)?;
        let inventory = self.inventory()?;
        let dest = self.store.destination();
        MigrationPlan::build(&inventory, dest.as_deref())
    }

    pub fn run_migration<F>(
        &self,
        plan: MigrationPlan,
        mode: MigrationMode,
        confirm: F,
        reporter: &dyn ProgressReporter,
    ) -> Result<MigrationRun, Error>
    where
        F: FnOnce(&MigrationPlan) -> io::Result<bool>,
    {
        let run = migration_plan::run_migration(plan, mode, confirm, &self.runner, reporter)?;
        if let MigrationRun::Executed(..) = run {
            self.store.record_phase_time(Phase::Migrate)?;
        }
        Ok(run)
    }
}
