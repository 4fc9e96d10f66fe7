use serde::de::DeserializeOwned;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::trace;

use super::models::{CleanRecord, ScanRecord};

/// Per-directory infrastructure folder holding tool artifacts.
pub const INFRA_DIR: &str = ".freight";

const SCAN_FILE: &str = "scan.json";
const CLEAN_FILE: &str = "clean.json";

/// Result of reading one per-candidate artifact.
///
/// A corrupt artifact is not an error: it degrades the candidate and carries
/// the reason so callers can surface it.
#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactLoad<T> {
    Loaded(T),
    Missing,
    Degraded(String),
}

impl<T> ArtifactLoad<T> {
    pub fn ok(self) -> Option<T> {
        match self {
            ArtifactLoad::Loaded(v) => Some(v),
            _ => None,
        }
    }
}

pub fn scan_artifact_path(dir: &Path) -> PathBuf {
    dir.join(INFRA_DIR).join(SCAN_FILE)
}

pub fn clean_artifact_path(dir: &Path) -> PathBuf {
    dir.join(INFRA_DIR).join(CLEAN_FILE)
}

pub fn load_scan_record(dir: &Path) -> ArtifactLoad<ScanRecord> {
    load_artifact(&scan_artifact_path(dir))
}

pub fn load_clean_record(dir: &Path) -> ArtifactLoad<CleanRecord> {
    load_artifact(&clean_artifact_path(dir))
}

fn load_artifact<T: DeserializeOwned>(path: &Path) -> ArtifactLoad<T> {
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            trace!("No artifact at {}", path.display());
            return ArtifactLoad::Missing;
        }
        Err(e) => return ArtifactLoad::Degraded(e.to_string()),
    };

    match serde_json::from_str(&contents) {
        Ok(record) => ArtifactLoad::Loaded(record),
        Err(e) => ArtifactLoad::Degraded(e.to_string()),
    }
}
