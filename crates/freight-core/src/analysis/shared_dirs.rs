use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::scanner;

pub const DEFAULT_SHARED_THRESHOLD: usize = 2;

/// Child names that are never counted, whatever the config says.
pub const IMPLICIT_IGNORE: [&str; 2] = [".freight", ".ssh"];

/// Configurable part of the analysis, read from the `clean` config section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedDirSettings {
    pub threshold: usize,
    pub ignore: Vec<String>,
}

impl Default for SharedDirSettings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SHARED_THRESHOLD,
            ignore: IMPLICIT_IGNORE.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl SharedDirSettings {
    /// Implicit names unioned with the configured ones.
    pub fn ignore_set(&self) -> BTreeSet<String> {
        IMPLICIT_IGNORE
            .iter()
            .map(|s| s.to_string())
            .chain(self.ignore.iter().cloned())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SharedDirectory {
    pub name: String,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SharedDirReport {
    pub total_candidates: usize,
    pub threshold: usize,
    pub ignored: Vec<String>,
    /// Occurrence count for every non-ignored child name.
    pub counts: HashMap<String, usize>,
    /// Names at or above the threshold, count descending then name ascending.
    pub shared: Vec<SharedDirectory>,
    /// Candidates that could not be listed.
    pub inaccessible: Vec<PathBuf>,
}

impl SharedDirReport {
    pub fn unique_names(&self) -> usize {
        self.counts.len()
    }

    /// Names frequent enough to be worth cleaning up before migrating.
    pub fn high_frequency(&self, limit: usize) -> Vec<&SharedDirectory> {
        let floor = (self.threshold + 1).max(3);
        self.shared
            .iter()
            .filter(|s| s.count >= floor)
            .take(limit)
            .collect()
    }
}

/// Count child directory names one level below each candidate.
pub fn count_child_directories(
    candidates: &[PathBuf],
    ignore: &BTreeSet<String>,
) -> (HashMap<String, usize>, Vec<PathBuf>) {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut inaccessible = Vec::new();

    for dir in candidates {
        let names = match scanner::list_child_dir_names(dir) {
            Ok(names) => names,
            Err(e) => {
                warn!("Could not access {}: {}", dir.display(), e);
                inaccessible.push(dir.clone());
                continue;
            }
        };
        for name in names {
            if !ignore.contains(&name) {
                *counts.entry(name).or_insert(0) += 1;
            }
        }
    }

    (counts, inaccessible)
}

/// Keep names meeting `threshold`, ordered by count descending then name.
pub fn rank_shared(
    counts: &HashMap<String, usize>,
    threshold: usize,
    total_candidates: usize,
) -> Vec<SharedDirectory> {
    let mut shared: Vec<SharedDirectory> = counts
        .iter()
        .filter(|(_, count)| **count >= threshold)
        .map(|(name, &count)| SharedDirectory {
            name: name.clone(),
            count,
            percentage: if total_candidates > 0 {
                count as f64 / total_candidates as f64 * 100.0
            } else {
                0.0
            },
        })
        .collect();

    shared.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    shared
}

/// Full analysis over the given candidate directories.
///
/// `threshold_override` replaces the configured threshold for this call only.
pub fn analyze_shared_directories(
    candidates: &[PathBuf],
    settings: &SharedDirSettings,
    threshold_override: Option<usize>,
) -> SharedDirReport {
    let threshold = threshold_override.unwrap_or(settings.threshold);
    let ignore = settings.ignore_set();

    let (counts, inaccessible) = count_child_directories(candidates, &ignore);
    let shared = rank_shared(&counts, threshold, candidates.len());
    info!(
        "{} shared directory names (threshold {}) across {} candidates",
        shared.len(),
        threshold,
        candidates.len()
    );

    SharedDirReport {
        total_candidates: candidates.len(),
        threshold,
        ignored: ignore.into_iter().collect(),
        counts,
        shared,
        inaccessible,
    }
}
