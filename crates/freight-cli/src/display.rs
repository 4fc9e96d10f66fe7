use colored::*;
use console::{measure_text_width, truncate_str, Term};
use freight_core::aggregate::{Candidate, Inventory};
use freight_core::analysis::{MigrationOutcome, MigrationPlan, SharedDirReport};
use freight_core::size::{format_count, format_size};
use freight_core::{ScanSummary, Statistics};

const RULE_WIDTH: usize = 60;
const MIN_BLOCK_WIDTH: usize = 35;
const BLOCK_SEPARATOR: &str = "  ";

fn rule() {
    println!("{}", "=".repeat(RULE_WIDTH).cyan());
}

fn header(title: &str, root: &str) {
    println!("\n{}", title.bold().cyan());
    rule();
    println!("Root: {}", root.white());
}

pub fn print_overview(inventory: &Inventory, stats: &Statistics) {
    header("Freight Overview", &inventory.root().display().to_string());

    println!("\n{}", "Summary:".bold());
    println!(
        "  Scan status: {}/{} ({})",
        stats.scanned_directories.to_string().green(),
        stats.total_directories.to_string().white(),
        format!("{:.1}%", stats.completion_rate).yellow()
    );
    if stats.scanned_directories > 0 {
        println!("  Total size: {}", format_size(stats.total_size_bytes).white());
        println!("  Total files: {}", format_count(stats.total_files).white());
    }
    if stats.total_cleanable_bytes > 0 {
        println!(
            "  Potential space savings: {}",
            format_size(stats.total_cleanable_bytes).yellow()
        );
    }

    let largest = inventory.largest(3);
    if !largest.is_empty() {
        println!("\n{}", "Largest Directories:".bold());
        for (medal, candidate) in ["🥇", "🥈", "🥉"].iter().zip(largest) {
            println!(
                "  {} {}: {}",
                medal,
                candidate.name,
                format_size(candidate.size_bytes()).white()
            );
        }
    }

    println!("\n{}", "Directory Status:".bold());
    rule();
    print_directory_grid(inventory.candidates());
    rule();
}

fn print_directory_grid(candidates: &[Candidate]) {
    if candidates.is_empty() {
        println!("{}", "No candidate directories found.".yellow());
        return;
    }

    let (_, cols) = Term::stdout().size();
    let terminal_width = if cols == 0 { 80 } else { cols as usize };
    let per_row = (terminal_width / MIN_BLOCK_WIDTH).max(1);

    for row in candidates.chunks(per_row) {
        let separators = (row.len() - 1) * BLOCK_SEPARATOR.len();
        let block_width = (terminal_width.saturating_sub(separators) / row.len()).max(30);

        let mut blocks: Vec<Vec<String>> = row
            .iter()
            .map(|c| directory_block(c, block_width))
            .collect();
        let height = blocks.iter().map(Vec::len).max().unwrap_or(0);
        for block in &mut blocks {
            block.resize(height, " ".repeat(block_width));
        }

        for line in 0..height {
            let parts: Vec<&str> = blocks.iter().map(|b| b[line].as_str()).collect();
            println!("{}", parts.join(BLOCK_SEPARATOR).trim_end());
        }
        println!();
    }
}

fn pad(text: String, width: usize) -> String {
    let visible = measure_text_width(&text);
    if visible >= width {
        return text;
    }
    format!("{}{}", text, " ".repeat(width - visible))
}

fn directory_block(candidate: &Candidate, width: usize) -> Vec<String> {
    let icon = if candidate.has_scan() {
        "✓".green()
    } else {
        "✗".red()
    };
    let name = truncate_str(&candidate.name, width.saturating_sub(3), "...");
    let mut lines = vec![pad(format!("{} {}", name, icon), width)];

    if !candidate.has_scan() {
        lines.push(pad("Not scanned".red().to_string(), width));
        return lines;
    }

    lines.push(pad(format!("Size: {}", format_size(candidate.size_bytes())), width));
    lines.push(pad(format!("Files: {}", format_count(candidate.file_count())), width));
    if let Some(date) = candidate.scan_date() {
        lines.push(pad(format!("Scanned: {}", date), width));
    } else if let Some(date) = candidate.directory_mtime_date() {
        lines.push(pad(format!("Modified: {}", date), width));
    }

    let problems = candidate.problem_directories();
    if !problems.is_empty() {
        let savings: u64 = problems.iter().map(|p| p.bytes_saved).sum();
        lines.push(pad(format!("Savings: {}", format_size(savings)), width));
        for problem in problems.iter().take(2) {
            let size = format_size(problem.bytes_saved);
            let room = width.saturating_sub(size.len() + 5);
            let pattern = truncate_str(&problem.pattern, room, "...");
            lines.push(pad(format!("• {} ({})", pattern, size), width));
        }
        if problems.len() > 2 {
            lines.push(pad(format!("+ {} more...", problems.len() - 2), width));
        }
    }
    lines
}

pub fn print_scan_summary(summary: &ScanSummary) {
    println!("\n{}", "Scan Summary:".bold());
    println!("  Successful: {}", summary.successful.to_string().green());
    println!("  Skipped (unchanged): {}", summary.skipped.to_string().white());
    if summary.failed.is_empty() {
        println!("  Failed: {}", "0".white());
        return;
    }
    println!("  Failed: {}", summary.failed_count().to_string().red());
    for failure in &summary.failed {
        println!("    • {}: {}", failure.name.yellow(), failure.message);
    }
}

pub fn print_shared_report(root: &str, report: &SharedDirReport) {
    header("Freight Shared Directory Analysis", root);
    if !report.ignored.is_empty() {
        println!("Ignoring: {}", report.ignored.join(", ").yellow());
    }

    if report.counts.is_empty() {
        println!("\n{}", "No directories found in subdirectories.".yellow());
        return;
    }
    if report.shared.is_empty() {
        println!(
            "\n{}",
            format!(
                "No shared directories found with threshold >= {}.",
                report.threshold
            )
            .yellow()
        );
        println!("Total unique directory names: {}", report.unique_names());
        return;
    }

    println!(
        "\nThreshold: {} or more occurrences",
        report.threshold.to_string().white()
    );
    println!(
        "Found {} shared directories:",
        report.shared.len().to_string().green()
    );
    println!("\n{:<30} {:<8} {}", "Directory Name", "Count", "Percentage");
    println!("{}", "-".repeat(50));
    for shared in &report.shared {
        println!("{:<30} {:<8} {:.1}%", shared.name, shared.count, shared.percentage);
    }

    println!("\n{}", "Analysis Summary:".bold());
    println!(
        "  Total subdirectories scanned: {}",
        report.total_candidates.to_string().white()
    );
    println!(
        "  Unique directory names found: {}",
        report.unique_names().to_string().white()
    );
    println!(
        "  Shared directories (>= {}): {}",
        report.threshold,
        report.shared.len().to_string().green()
    );
    if !report.inaccessible.is_empty() {
        println!(
            "  Inaccessible: {}",
            report.inaccessible.len().to_string().red()
        );
    }

    let frequent = report.high_frequency(10);
    if !frequent.is_empty() {
        println!(
            "\n{}",
            "High-frequency directories (potential cleanup candidates):".bold()
        );
        for shared in frequent {
            println!("  • {} ({} occurrences)", shared.name.yellow(), shared.count);
        }
    }
    println!();
    rule();
}

pub fn print_migration_plan(plan: &MigrationPlan, large_dir_threshold: u64) {
    header(
        "Freight Migration Plan",
        &plan.migration_root.display().to_string(),
    );
    println!("Destination: {}", plan.dest_path.display().to_string().white());
    println!(
        "\n{} directories, {} in {} files (smallest first):\n",
        plan.len().to_string().green(),
        format_size(plan.total_size()).white(),
        format_count(plan.total_files()).white()
    );
    for (i, entry) in plan.entries.iter().enumerate() {
        let size = format_size(entry.size_bytes);
        let size = if entry.size_bytes >= large_dir_threshold {
            size.yellow()
        } else {
            size.normal()
        };
        println!(
            "  {:>3}. {:<30} {:>10}  -> {}",
            i + 1,
            entry.name,
            size,
            entry.destination.display()
        );
    }
    println!();
}

pub fn print_migration_outcome(outcome: &MigrationOutcome) {
    println!("\n{}", "Migration Summary:".bold());
    println!(
        "  Migrated: {}/{}",
        outcome.successful().to_string().green(),
        outcome.total
    );
    if !outcome.failed.is_empty() {
        println!("  Failed: {}", outcome.failed.len().to_string().red());
        for failure in &outcome.failed {
            println!("    • {}: {}", failure.name.yellow(), failure.message);
        }
    }
}
