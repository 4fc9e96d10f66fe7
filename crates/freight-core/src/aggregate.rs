//! Candidate aggregation: one pass over the migration root that pairs every
//! candidate directory with whatever scan/clean artifacts it carries.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::Error;
use crate::scanner;
use crate::storage::artifacts::{self, ArtifactLoad};
use crate::storage::{CleanPattern, CleanRecord, ScanRecord};

/// One migration unit: an immediate subdirectory of the migration root.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub name: String,
    pub path: PathBuf,
    pub scan: Option<ScanRecord>,
    pub clean: Option<CleanRecord>,
}

impl Candidate {
    /// Load a candidate's artifacts. Corrupt artifacts are logged and treated
    /// as absent.
    pub fn load(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let scan = match artifacts::load_scan_record(&path) {
            ArtifactLoad::Loaded(record) => Some(record),
            ArtifactLoad::Missing => None,
            ArtifactLoad::Degraded(reason) => {
                warn!(
                    "Could not parse {}: {}",
                    artifacts::scan_artifact_path(&path).display(),
                    reason
                );
                None
            }
        };

        let clean = match artifacts::load_clean_record(&path) {
            ArtifactLoad::Loaded(record) => Some(record),
            ArtifactLoad::Missing => None,
            ArtifactLoad::Degraded(reason) => {
                warn!(
                    "Could not parse {}: {}",
                    artifacts::clean_artifact_path(&path).display(),
                    reason
                );
                None
            }
        };

        Self { name, path, scan, clean }
    }

    pub fn has_scan(&self) -> bool {
        self.scan.is_some()
    }

    pub fn has_clean_data(&self) -> bool {
        self.clean.is_some()
    }

    pub fn size_bytes(&self) -> u64 {
        self.scan.as_ref().map_or(0, |s| s.size_bytes)
    }

    pub fn file_count(&self) -> u64 {
        self.scan.as_ref().map_or(0, |s| s.file_count)
    }

    pub fn scan_time(&self) -> Option<&str> {
        self.scan.as_ref().and_then(|s| s.scan_time.as_deref())
    }

    /// Date portion of the recorded scan timestamp.
    pub fn scan_date(&self) -> Option<&str> {
        self.scan_time().map(|t| t.get(..10).unwrap_or(t))
    }

    /// Recorded directory mtime rendered as a UTC date.
    pub fn directory_mtime_date(&self) -> Option<String> {
        let epoch = self.scan.as_ref()?.directory_mtime?;
        DateTime::<Utc>::from_timestamp(epoch, 0).map(|dt| dt.format("%Y-%m-%d").to_string())
    }

    pub fn bytes_cleaned(&self) -> u64 {
        self.clean.as_ref().map_or(0, |c| c.bytes_cleaned)
    }

    pub fn problem_directories(&self) -> Vec<&CleanPattern> {
        self.clean
            .as_ref()
            .map(|c| c.problem_directories().collect())
            .unwrap_or_default()
    }
}

/// Cross-candidate statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Statistics {
    pub total_directories: usize,
    pub scanned_directories: usize,
    pub unscanned_directories: usize,
    pub completion_rate: f64,
    pub total_size_bytes: u64,
    pub total_files: u64,
    pub total_cleanable_bytes: u64,
}

impl Statistics {
    pub fn from_candidates(candidates: &[Candidate]) -> Self {
        let total_directories = candidates.len();
        let scanned: Vec<&Candidate> = candidates.iter().filter(|c| c.has_scan()).collect();
        let scanned_directories = scanned.len();

        let completion_rate = if total_directories > 0 {
            scanned_directories as f64 / total_directories as f64 * 100.0
        } else {
            0.0
        };

        Self {
            total_directories,
            scanned_directories,
            unscanned_directories: total_directories - scanned_directories,
            completion_rate,
            total_size_bytes: scanned.iter().map(|c| c.size_bytes()).sum(),
            total_files: scanned.iter().map(|c| c.file_count()).sum(),
            total_cleanable_bytes: candidates
                .iter()
                .filter(|c| c.has_clean_data())
                .map(|c| c.bytes_cleaned())
                .sum(),
        }
    }
}

/// The aggregated, name-sorted candidate list for one migration root.
#[derive(Debug, Clone)]
pub struct Inventory {
    root: PathBuf,
    candidates: Vec<Candidate>,
}

impl Inventory {
    /// Enumerate and load every candidate under `root`.
    pub fn collect(root: &Path) -> Result<Self, Error> {
        let dirs = scanner::list_candidate_dirs(root)?;
        let candidates: Vec<Candidate> = dirs.into_iter().map(Candidate::load).collect();
        debug!(
            "Aggregated {} candidates under {}",
            candidates.len(),
            root.display()
        );
        Ok(Self::from_candidates(root, candidates))
    }

    pub fn from_candidates(root: &Path, mut candidates: Vec<Candidate>) -> Self {
        candidates.sort_by(|a, b| a.name.cmp(&b.name));
        Self {
            root: root.to_path_buf(),
            candidates,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn scanned(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter().filter(|c| c.has_scan())
    }

    pub fn statistics(&self) -> Statistics {
        Statistics::from_candidates(&self.candidates)
    }

    /// Up to `n` scanned candidates with non-zero size, largest first.
    pub fn largest(&self, n: usize) -> Vec<&Candidate> {
        let mut sized: Vec<&Candidate> = self.scanned().filter(|c| c.size_bytes() > 0).collect();
        sized.sort_by(|a, b| b.size_bytes().cmp(&a.size_bytes()));
        sized.truncate(n);
        sized
    }

    pub fn report(&self) -> OverviewReport {
        OverviewReport {
            stats: self.statistics(),
            directories: self
                .candidates
                .iter()
                .map(|c| DirectoryReport {
                    name: c.name.clone(),
                    directory: c.path.to_string_lossy().into_owned(),
                    has_scan: c.has_scan(),
                    size_bytes: c.size_bytes(),
                    file_count: c.file_count(),
                    has_clean_data: c.has_clean_data(),
                    bytes_cleaned: c.bytes_cleaned(),
                    scan_time: c.scan_time().map(str::to_string),
                })
                .collect(),
            migration_root: self.root.to_string_lossy().into_owned(),
        }
    }
}

/// Read-only aggregate document for external consumers.
#[derive(Debug, Clone, Serialize)]
pub struct OverviewReport {
    pub stats: Statistics,
    pub directories: Vec<DirectoryReport>,
    pub migration_root: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DirectoryReport {
    pub name: String,
    pub directory: String,
    pub has_scan: bool,
    pub size_bytes: u64,
    pub file_count: u64,
    pub has_clean_data: bool,
    pub bytes_cleaned: u64,
    pub scan_time: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, scan: Option<(u64, u64)>, cleaned: Option<u64>) -> Candidate {
        Candidate {
            name: name.to_string(),
            path: PathBuf::from("/root").join(name),
            scan: scan.map(|(size_bytes, file_count)| ScanRecord {
                size_bytes,
                file_count,
                ..ScanRecord::default()
            }),
            clean: cleaned.map(|bytes_cleaned| CleanRecord {
                bytes_cleaned,
                patterns: Vec::new(),
            }),
        }
    }

    #[test]
    fn test_empty_statistics() {
        let stats = Statistics::from_candidates(&[]);
        assert_eq!(stats.total_directories, 0);
        assert_eq!(stats.completion_rate, 0.0);
    }

    #[test]
    fn test_statistics_only_sum_scanned() {
        let candidates = vec![
            candidate("a", Some((100, 3)), None),
            candidate("b", None, Some(40)),
            candidate("c", Some((50, 2)), Some(10)),
        ];
        let stats = Statistics::from_candidates(&candidates);
        assert_eq!(stats.total_directories, 3);
        assert_eq!(stats.scanned_directories, 2);
        assert_eq!(stats.unscanned_directories, 1);
        assert_eq!(stats.total_size_bytes, 150);
        assert_eq!(stats.total_files, 5);
        assert_eq!(stats.total_cleanable_bytes, 50);
        assert!((stats.completion_rate - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(
            stats.scanned_directories + stats.unscanned_directories,
            stats.total_directories
        );
    }

    #[test]
    fn test_largest_skips_unscanned_and_empty() {
        let inventory = Inventory::from_candidates(
            Path::new("/root"),
            vec![
                candidate("small", Some((10, 1)), None),
                candidate("empty", Some((0, 0)), None),
                candidate("big", Some((900, 1)), None),
                candidate("unscanned", None, None),
                candidate("medium", Some((300, 1)), None),
                candidate("tiny", Some((1, 1)), None),
            ],
        );
        let names: Vec<&str> = inventory.largest(3).iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["big", "medium", "small"]);
    }

    #[test]
    fn test_scan_and_mtime_dates() {
        let mut c = candidate("a", Some((1, 1)), None);
        if let Some(scan) = c.scan.as_mut() {
            scan.scan_time = Some("2024-03-01T10:00:00Z".to_string());
            scan.directory_mtime = Some(0);
        }
        assert_eq!(c.scan_date(), Some("2024-03-01"));
        assert_eq!(c.directory_mtime_date().as_deref(), Some("1970-01-01"));
    }
}
