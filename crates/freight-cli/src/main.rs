mod commands;
mod display;
mod logging;
mod progress;

use std::env;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::Parser;
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use freight_core::analysis::{MigrationMode, MigrationRun};
use freight_core::config::{load_settings, resolve_path};
use freight_core::scanner::ensure_root;
use freight_core::size::format_size;
use freight_core::storage::{ConfigStore, VersionCheck, ENGINE_VERSION};
use freight_core::{Error, Orchestrator, ScanRun, ScriptRunner};
use progress::CliReporter;
use tracing::{error, info};

fn main() {
    dotenv().ok();

    let _guard = logging::init_logger();
    let args = Cli::parse();

    match run(args) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(err) => {
            error!("{:#}", err);
            eprintln!("{} {}", "Error:".red().bold(), err);
            if let Some(hint) = err.downcast_ref::<Error>().and_then(Error::remediation) {
                eprintln!("{}", hint.yellow());
            }
            process::exit(1);
        }
    }
}

/// Returns `Ok(false)` when the command ran but some candidates failed.
fn run(args: Cli) -> anyhow::Result<bool> {
    let settings = load_settings().map_err(Error::from)?;
    let store = ConfigStore::new(&settings.config_path);
    let runner = ScriptRunner::new(&settings.scripts_dir);

    let command = args.command.unwrap_or(Commands::Overview {
        migration_root: None,
        json: false,
    });

    match command {
        Commands::Init { directory } => run_init(&store, directory),
        Commands::Scan { migration_root } => {
            let orch = open(migration_root, store, runner)?;
            run_scan(&orch)
        }
        Commands::Overview {
            migration_root,
            json,
        } => {
            let orch = open(migration_root, store, runner)?;
            run_overview(&orch, json)
        }
        Commands::Clean {
            migration_root,
            confirm,
            script_args,
        } => {
            let orch = open(migration_root, store, runner)?;
            run_clean(&orch, confirm, &script_args)
        }
        Commands::Shared {
            migration_root,
            threshold,
        } => {
            let orch = open(migration_root, store, runner)?;
            let report = orch.shared_directories(threshold)?;
            display::print_shared_report(&orch.root().display().to_string(), &report);
            Ok(true)
        }
        Commands::Migrate {
            migration_root,
            confirm,
        } => {
            let orch = open(migration_root, store, runner)?;
            run_migrate(&orch, confirm)
        }
    }
}

/// Resolve the root, create the config skeleton if missing, and warn on a
/// version mismatch.
fn open(
    migration_root: Option<PathBuf>,
    store: ConfigStore,
    runner: ScriptRunner,
) -> anyhow::Result<Orchestrator<ScriptRunner>> {
    let orch = Orchestrator::new(migration_root.as_deref(), store, runner)?;

    if orch.ensure_global_config()? {
        eprintln!(
            "{} {}",
            "Created global config:".green(),
            orch.config_store().path().display()
        );
    }

    match orch.check_version() {
        VersionCheck::Mismatch { found } => eprintln!(
            "{}",
            format!(
                "Warning: config version {} differs from freight {}; continuing",
                found, ENGINE_VERSION
            )
            .yellow()
        ),
        VersionCheck::Unreadable(reason) => eprintln!(
            "{}",
            format!("Warning: could not read global config: {}", reason).yellow()
        ),
        VersionCheck::Absent | VersionCheck::Compatible => {}
    }

    Ok(orch)
}

fn run_init(store: &ConfigStore, directory: Option<PathBuf>) -> anyhow::Result<bool> {
    if store.exists() {
        return Err(Error::AlreadyInitialized(store.path().to_path_buf()).into());
    }

    println!("{}", "Freight initialization".bold().cyan());

    let source = match directory {
        Some(dir) => dir,
        None => {
            let cwd = env::current_dir().context("Cannot determine the current directory")?;
            let answer = prompt_input(&format!(
                "Source directory to migrate [{}]: ",
                cwd.display()
            ))?;
            if answer.is_empty() {
                cwd
            } else {
                PathBuf::from(answer)
            }
        }
    };
    let source = resolve_path(&source);
    ensure_root(&source)?;

    let dest = loop {
        let answer = prompt_input("Destination directory (required): ")?;
        if !answer.is_empty() {
            break resolve_path(Path::new(&answer));
        }
        eprintln!("{}", "A destination directory is required.".yellow());
    };

    store.initialize(&source, &dest)?;
    info!("Initialized {} -> {}", source.display(), dest.display());

    println!("\n{} {}", "Created global config:".green(), store.path().display());
    println!("  Source:      {}", source.display().to_string().white());
    println!("  Destination: {}", dest.display().to_string().white());
    println!("\nNext: run `freight scan` to inventory the candidate directories.");
    Ok(true)
}

fn run_overview(orch: &Orchestrator<ScriptRunner>, json: bool) -> anyhow::Result<bool> {
    if json {
        let report = orch.overview_report()?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(true);
    }

    let inventory = orch.inventory()?;
    let stats = orch.statistics(&inventory)?;
    display::print_overview(&inventory, &stats);
    Ok(true)
}

fn run_scan(orch: &Orchestrator<ScriptRunner>) -> anyhow::Result<bool> {
    println!("Scanning candidates under {}", orch.root().display().to_string().white());
    let reporter = CliReporter::new("Scanning");

    match orch.run_scan(&reporter)? {
        ScanRun::NoSubdirectories => {
            println!(
                "{}",
                format!("No subdirectories found in {}", orch.root().display()).yellow()
            );
            Ok(true)
        }
        ScanRun::Completed(summary) => {
            display::print_scan_summary(&summary);
            // Refresh persisted statistics from the new artifacts.
            let inventory = orch.inventory()?;
            orch.statistics(&inventory)?;
            Ok(summary.failed.is_empty())
        }
    }
}

fn run_clean(
    orch: &Orchestrator<ScriptRunner>,
    confirm: bool,
    script_args: &[String],
) -> anyhow::Result<bool> {
    if confirm {
        println!("{}", "Cleaning (files will be removed)".red().bold());
    } else {
        println!("{}", "Clean dry run (pass --confirm to remove files)".yellow());
    }

    let output = orch.run_clean(confirm, script_args)?;
    if output.success {
        println!("  \x1b[32m✓\x1b[0m Clean complete for {}", orch.root().display());
        Ok(true)
    } else {
        eprintln!("{} {}", "Clean failed:".red(), output.diagnostic());
        Ok(false)
    }
}

fn run_migrate(orch: &Orchestrator<ScriptRunner>, confirm: bool) -> anyhow::Result<bool> {
    let plan = orch.plan_migration()?;
    display::print_migration_plan(&plan, orch.config_store().large_dir_threshold());

    let mode = if confirm {
        MigrationMode::Confirmed
    } else {
        MigrationMode::DryRun
    };
    let reporter = CliReporter::new("Migrating");
    let run = orch.run_migration(
        plan,
        mode,
        |plan| {
            prompt_confirm(
                &format!(
                    "Migrate {} directories ({}) to {}?",
                    plan.len(),
                    format_size(plan.total_size()),
                    plan.dest_path.display()
                ),
                Some(false),
            )
        },
        &reporter,
    )?;

    match run {
        MigrationRun::Planned(_) => {
            println!(
                "{}",
                "Dry run: nothing was transferred. Re-run with --confirm to migrate.".yellow()
            );
            Ok(true)
        }
        MigrationRun::Declined(_) => {
            println!("Migration cancelled.");
            Ok(true)
        }
        MigrationRun::Executed(_, outcome) => {
            display::print_migration_outcome(&outcome);
            if outcome.failed.is_empty() {
                return Ok(true);
            }
            println!(
                "\nRe-run `freight migrate --confirm` to retry: {}",
                outcome.failed_names().join(", ").yellow()
            );
            Ok(false)
        }
    }
}

fn prompt_input(prompt: &str) -> io::Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let mut input = String::new();

    loop {
        input.clear();

        match default {
            Some(true) => print!("{} (Y/n): ", prompt),
            Some(false) | None => print!("{} (y/N): ", prompt),
        }
        io::stdout().flush()?;

        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(default.unwrap_or(false));
        }

        match input.trim().to_uppercase().as_str() {
            "Y" | "YES" => return Ok(true),
            "N" | "NO" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}
