use freight_core::ProgressReporter;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

/// CLI progress reporter for sequential per-candidate batches.
///
/// One bar spans the batch; each candidate's result is printed above it.
pub struct CliReporter {
    verb: &'static str,
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new(verb: &'static str) -> Self {
        Self {
            verb,
            bar: Mutex::new(None),
        }
    }

    fn with_bar<F: FnOnce(&ProgressBar)>(&self, f: F) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                f(pb);
            }
        }
    }

    fn println(&self, line: String) {
        let mut printed = false;
        self.with_bar(|pb| {
            pb.println(&line);
            printed = true;
        });
        if !printed {
            eprintln!("{}", line);
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_batch_start(&self, total: usize) {
        let pb = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::with_template(
            "  {spinner:.cyan} [{bar:30.cyan/dim}] {pos}/{len} {msg}",
        ) {
            pb.set_style(style.progress_chars("━╸─").tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
        }
        pb.enable_steady_tick(Duration::from_millis(80));
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.replace(pb) {
                old.finish_and_clear();
            }
        }
    }

    fn on_candidate_start(&self, _index: usize, name: &str) {
        let message = format!("{} {}", self.verb, name);
        self.with_bar(|pb| pb.set_message(message));
    }

    fn on_candidate_skipped(&self, _index: usize, name: &str, reason: &str) {
        self.println(format!("  \x1b[2m-\x1b[0m {} ({})", name, reason));
        self.with_bar(|pb| pb.inc(1));
    }

    fn on_candidate_success(&self, _index: usize, name: &str) {
        self.println(format!("  \x1b[32m✓\x1b[0m {}", name));
        self.with_bar(|pb| pb.inc(1));
    }

    fn on_candidate_failure(&self, _index: usize, name: &str, message: &str) {
        self.println(format!("  \x1b[31m✗\x1b[0m {}: {}", name, message));
        self.with_bar(|pb| pb.inc(1));
    }

    fn on_batch_complete(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }
}
