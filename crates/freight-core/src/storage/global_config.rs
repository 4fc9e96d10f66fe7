use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::aggregate::Statistics;
use crate::analysis::shared_dirs::{SharedDirSettings, DEFAULT_SHARED_THRESHOLD, IMPLICIT_IGNORE};
use crate::config::resolve_path;
use crate::error::Error;

/// Version of the engine; compared against `config_version` on every run.
pub const ENGINE_VERSION: &str = "1.3";

const DEFAULT_TRANSFER_FLAGS: &str = "-avxHAX --numeric-ids --compress --partial --info=progress2";
const DEFAULT_LARGE_DIR_THRESHOLD: u64 = 3 * 1024 * 1024 * 1024;

/// The singleton configuration and running-statistics record.
///
/// Keys this engine does not know about are kept in `extra` and written back
/// untouched. Known keys are read one at a time, so a malformed value only
/// costs that key its default.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalConfig {
    pub config_version: String,
    pub migration_root: Option<PathBuf>,
    pub dest_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
    pub scan: ScanSection,
    pub clean: CleanSection,
    pub migrate: MigrateSection,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanSection {
    pub last_scan_time: Option<String>,
    pub total_directories: usize,
    pub total_size_bytes: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanSection {
    pub last_clean_time: Option<String>,
    pub target_directories: Vec<String>,
    pub shared_directory_threshold: usize,
    pub shared_directory_ignore: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrateSection {
    pub last_migrate_time: Option<String>,
    pub transfer_flags: String,
    pub large_dir_threshold_bytes: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for CleanSection {
    fn default() -> Self {
        Self {
            last_clean_time: None,
            target_directories: Vec::new(),
            shared_directory_threshold: default_threshold(),
            shared_directory_ignore: default_ignore(),
            extra: Map::new(),
        }
    }
}

impl Default for MigrateSection {
    fn default() -> Self {
        Self {
            last_migrate_time: None,
            transfer_flags: default_transfer_flags(),
            large_dir_threshold_bytes: default_large_dir_threshold(),
            extra: Map::new(),
        }
    }
}

impl ScanSection {
    fn from_map(mut obj: Map<String, Value>) -> Self {
        Self {
            last_scan_time: take(&mut obj, &["last_scan_time"]),
            total_directories: take(&mut obj, &["total_directories"]).unwrap_or_default(),
            total_size_bytes: take(&mut obj, &["total_size_bytes"]).unwrap_or_default(),
            extra: obj,
        }
    }
}

impl CleanSection {
    fn from_map(mut obj: Map<String, Value>) -> Self {
        Self {
            last_clean_time: take(&mut obj, &["last_clean_time"]),
            target_directories: take(&mut obj, &["target_directories"]).unwrap_or_default(),
            shared_directory_threshold: take(&mut obj, &["shared_directory_threshold"])
                .unwrap_or_else(default_threshold),
            shared_directory_ignore: take(&mut obj, &["shared_directory_ignore"])
                .unwrap_or_else(default_ignore),
            extra: obj,
        }
    }
}

impl MigrateSection {
    fn from_map(mut obj: Map<String, Value>) -> Self {
        Self {
            last_migrate_time: take(&mut obj, &["last_migrate_time"]),
            transfer_flags: take(&mut obj, &["transfer_flags", "rsync_flags"])
                .unwrap_or_else(default_transfer_flags),
            large_dir_threshold_bytes: take(&mut obj, &["large_dir_threshold_bytes"])
                .unwrap_or_else(default_large_dir_threshold),
            extra: obj,
        }
    }
}

/// Remove `keys` (the current name first, then legacy aliases) from `obj` and
/// decode the first one present. Null and malformed values yield `None`.
fn take<T: DeserializeOwned>(obj: &mut Map<String, Value>, keys: &[&str]) -> Option<T> {
    let mut found = None;
    for key in keys {
        if let Some(value) = obj.remove(*key) {
            if found.is_none() && !value.is_null() {
                found = Some((*key, value));
            }
        }
    }
    let (key, value) = found?;
    match serde_json::from_value(value) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("Ignoring malformed config key '{}': {}", key, e);
            None
        }
    }
}

/// Section objects fall back to their defaults when absent or not an object.
fn take_section<T: Default>(
    obj: &mut Map<String, Value>,
    key: &str,
    from_map: fn(Map<String, Value>) -> T,
) -> T {
    match obj.remove(key) {
        Some(Value::Object(section)) => from_map(section),
        None | Some(Value::Null) => T::default(),
        Some(other) => {
            warn!("Ignoring malformed config section '{}': {}", key, other);
            T::default()
        }
    }
}

fn unknown_version() -> String {
    "unknown".to_string()
}

fn default_threshold() -> usize {
    DEFAULT_SHARED_THRESHOLD
}

fn default_ignore() -> Vec<String> {
    IMPLICIT_IGNORE.iter().map(|s| s.to_string()).collect()
}

fn default_transfer_flags() -> String {
    DEFAULT_TRANSFER_FLAGS.to_string()
}

fn default_large_dir_threshold() -> u64 {
    DEFAULT_LARGE_DIR_THRESHOLD
}

fn timestamp_now() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

impl GlobalConfig {
    /// Fresh skeleton written on first initialization.
    pub fn skeleton(migration_root: &Path, dest_path: Option<&Path>) -> Self {
        Self {
            config_version: ENGINE_VERSION.to_string(),
            migration_root: Some(migration_root.to_path_buf()),
            dest_path: dest_path.map(Path::to_path_buf),
            created_time: Some(timestamp_now()),
            scan: ScanSection::default(),
            clean: CleanSection::default(),
            migrate: MigrateSection::default(),
            extra: Map::new(),
        }
    }

    /// Build the record from parsed JSON. Only a non-object document is an
    /// error.
    pub fn from_value(value: Value) -> Result<Self, Error> {
        let mut obj: Map<String, Value> = serde_json::from_value(value)?;
        Ok(Self {
            config_version: take(&mut obj, &["config_version", "freight_version"])
                .unwrap_or_else(unknown_version),
            migration_root: take(&mut obj, &["migration_root"]),
            dest_path: take(&mut obj, &["dest_path"]),
            created_time: take(&mut obj, &["created_time"]),
            scan: take_section(&mut obj, "scan", ScanSection::from_map),
            clean: take_section(&mut obj, "clean", CleanSection::from_map),
            migrate: take_section(&mut obj, "migrate", MigrateSection::from_map),
            extra: obj,
        })
    }
}

/// Outcome of comparing the stored config version with [`ENGINE_VERSION`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionCheck {
    Absent,
    Compatible,
    Mismatch { found: String },
    Unreadable(String),
}

/// Migration phase whose completion time is recorded in the config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Scan,
    Clean,
    Migrate,
}

/// Filesystem-backed store for the [`GlobalConfig`] record.
///
/// Assumes a single writer: reads and writes are not locked. Saves go through
/// a temporary file and a rename so an interrupted write never leaves
/// truncated JSON behind.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the record; `Ok(None)` when no config has been created yet.
    pub fn load(&self) -> Result<Option<GlobalConfig>, Error> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let value: Value = serde_json::from_str(&contents)?;
        GlobalConfig::from_value(value).map(Some)
    }

    pub fn save(&self, config: &GlobalConfig) -> Result<(), Error> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp_path = self.path.with_extension("json.tmp");
        let body = serde_json::to_string_pretty(config)?;
        fs::write(&tmp_path, body)?;
        fs::rename(&tmp_path, &self.path)?;
        debug!("Wrote global config {}", self.path.display());
        Ok(())
    }

    /// Create the skeleton if no config exists. Returns whether it was created.
    pub fn ensure(&self, migration_root: &Path, dest_path: Option<&Path>) -> Result<bool, Error> {
        if self.exists() {
            return Ok(false);
        }
        self.save(&GlobalConfig::skeleton(migration_root, dest_path))?;
        info!("Created global config {}", self.path.display());
        Ok(true)
    }

    /// First-time initialization; refuses to touch an existing config.
    /// Both paths are stored absolute.
    pub fn initialize(&self, migration_root: &Path, dest_path: &Path) -> Result<(), Error> {
        if self.exists() {
            return Err(Error::AlreadyInitialized(self.path.clone()));
        }
        let migration_root = resolve_path(migration_root);
        let dest_path = resolve_path(dest_path);
        self.ensure(&migration_root, Some(&dest_path))?;
        Ok(())
    }

    pub fn migration_root(&self) -> Option<PathBuf> {
        match self.load() {
            Ok(config) => config.and_then(|c| c.migration_root),
            Err(e) => {
                debug!("Could not read migration root from {}: {}", self.path.display(), e);
                None
            }
        }
    }

    pub fn destination(&self) -> Option<PathBuf> {
        match self.load() {
            Ok(config) => config.and_then(|c| c.dest_path),
            Err(e) => {
                warn!("Could not read destination from {}: {}", self.path.display(), e);
                None
            }
        }
    }

    pub fn check_version(&self) -> VersionCheck {
        match self.load() {
            Ok(None) => VersionCheck::Absent,
            Ok(Some(config)) if config.config_version == ENGINE_VERSION => VersionCheck::Compatible,
            Ok(Some(config)) => {
                warn!(
                    "Config version {} does not match engine version {}",
                    config.config_version, ENGINE_VERSION
                );
                VersionCheck::Mismatch {
                    found: config.config_version,
                }
            }
            Err(e) => {
                warn!("Could not read config version: {}", e);
                VersionCheck::Unreadable(e.to_string())
            }
        }
    }

    /// Threshold and ignore list for shared-directory analysis, falling back
    /// to defaults when the config cannot be read.
    pub fn shared_dir_settings(&self) -> SharedDirSettings {
        match self.load() {
            Ok(Some(config)) => SharedDirSettings {
                threshold: config.clean.shared_directory_threshold,
                ignore: config.clean.shared_directory_ignore,
            },
            Ok(None) => SharedDirSettings::default(),
            Err(e) => {
                warn!("Could not read clean settings, using defaults: {}", e);
                SharedDirSettings::default()
            }
        }
    }

    /// Size above which a planned transfer is flagged as large.
    pub fn large_dir_threshold(&self) -> u64 {
        match self.load() {
            Ok(Some(config)) => config.migrate.large_dir_threshold_bytes,
            _ => DEFAULT_LARGE_DIR_THRESHOLD,
        }
    }

    /// Persist aggregate statistics. This is the only path that writes
    /// statistics into the record.
    pub fn update_stats(&self, stats: &Statistics) -> Result<bool, Error> {
        self.update(|config| {
            config.scan.total_directories = stats.total_directories;
            config.scan.total_size_bytes = stats.total_size_bytes;
        })
    }

    pub fn record_phase_time(&self, phase: Phase) -> Result<bool, Error> {
        let now = timestamp_now();
        self.update(|config| match phase {
            Phase::Scan => config.scan.last_scan_time = Some(now),
            Phase::Clean => config.clean.last_clean_time = Some(now),
            Phase::Migrate => config.migrate.last_migrate_time = Some(now),
        })
    }

    /// Read-modify-write. A missing or unreadable config is left alone and
    /// reported as `Ok(false)`.
    fn update<F>(&self, apply: F) -> Result<bool, Error>
    where
        F: FnOnce(&mut GlobalConfig),
    {
        let mut config = match self.load() {
            Ok(Some(config)) => config,
            Ok(None) => return Ok(false),
            Err(e) => {
                warn!("Skipping update of unreadable config {}: {}", self.path.display(), e);
                return Ok(false);
            }
        };
        apply(&mut config);
        self.save(&config)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store_in(dir: &Path) -> ConfigStore {
        ConfigStore::new(dir.join("config.json"))
    }

    #[test]
    fn test_ensure_creates_once() {
        let tmp = tempdir().unwrap();
        let store = store_in(tmp.path());

        assert!(store.ensure(Path::new("/srv/home"), None).unwrap());
        assert!(!store.ensure(Path::new("/elsewhere"), None).unwrap());

        let config = store.load().unwrap().unwrap();
        assert_eq!(config.config_version, ENGINE_VERSION);
        assert_eq!(config.migration_root, Some(PathBuf::from("/srv/home")));
        assert_eq!(config.clean.shared_directory_threshold, 2);
        assert_eq!(config.clean.shared_directory_ignore, vec![".freight", ".ssh"]);
        assert_eq!(config.migrate.large_dir_threshold_bytes, 3221225472);
    }

    #[test]
    fn test_initialize_refuses_existing() {
        let tmp = tempdir().unwrap();
        let store = store_in(tmp.path());
        store.initialize(Path::new("/src"), Path::new("/dst")).unwrap();
        assert!(matches!(
            store.initialize(Path::new("/src"), Path::new("/dst")),
            Err(Error::AlreadyInitialized(_))
        ));
        assert_eq!(store.destination(), Some(PathBuf::from("/dst")));
    }

    #[test]
    fn test_stats_round_trip() {
        let tmp = tempdir().unwrap();
        let store = store_in(tmp.path());
        store.ensure(Path::new("/srv"), None).unwrap();

        let stats = Statistics {
            total_directories: 7,
            total_size_bytes: 123_456,
            ..Statistics::default()
        };
        assert!(store.update_stats(&stats).unwrap());

        let config = store.load().unwrap().unwrap();
        assert_eq!(config.scan.total_directories, 7);
        assert_eq!(config.scan.total_size_bytes, 123_456);
    }

    #[test]
    fn test_update_without_config_is_noop() {
        let tmp = tempdir().unwrap();
        let store = store_in(tmp.path());
        assert!(!store.update_stats(&Statistics::default()).unwrap());
        assert!(!store.exists());
    }

    #[test]
    fn test_unknown_keys_preserved() {
        let tmp = tempdir().unwrap();
        let store = store_in(tmp.path());
        fs::write(
            store.path(),
            r#"{"config_version": "1.3", "migration_root": "/srv", "notes": "keep me",
                "scan": {"total_directories": 1, "owner": "ops"},
                "migrate": {"rsync_flags": "-a"}}"#,
        )
        .unwrap();

        store.update_stats(&Statistics { total_directories: 4, ..Statistics::default() }).unwrap();

        let raw: Value = serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["notes"], "keep me");
        assert_eq!(raw["scan"]["owner"], "ops");
        assert_eq!(raw["scan"]["total_directories"], 4);
        assert_eq!(raw["migrate"]["transfer_flags"], "-a");
    }

    #[test]
    fn test_version_checks() {
        let tmp = tempdir().unwrap();
        let store = store_in(tmp.path());
        assert_eq!(store.check_version(), VersionCheck::Absent);

        fs::write(store.path(), r#"{"freight_version": "1.0.0"}"#).unwrap();
        assert_eq!(
            store.check_version(),
            VersionCheck::Mismatch { found: "1.0.0".to_string() }
        );

        fs::write(store.path(), "garbage").unwrap();
        assert!(matches!(store.check_version(), VersionCheck::Unreadable(_)));
    }

    #[test]
    fn test_shared_settings_fall_back_on_bad_config() {
        let tmp = tempdir().unwrap();
        let store = store_in(tmp.path());
        fs::write(store.path(), r#"{"clean": {"shared_directory_threshold": "lots"}}"#).unwrap();

        let settings = store.shared_dir_settings();
        assert_eq!(settings, SharedDirSettings::default());
    }

    #[test]
    fn test_malformed_section_keeps_paths_readable() {
        let tmp = tempdir().unwrap();
        let store = store_in(tmp.path());
        fs::write(
            store.path(),
            r#"{"config_version": "1.3", "migration_root": "/srv/home", "dest_path": "/mnt/new",
                "scan": {"total_directories": "many", "total_size_bytes": 10},
                "clean": 7,
                "migrate": {"large_dir_threshold_bytes": -1, "transfer_flags": "-a"}}"#,
        )
        .unwrap();

        assert_eq!(store.destination(), Some(PathBuf::from("/mnt/new")));
        assert_eq!(store.migration_root(), Some(PathBuf::from("/srv/home")));
        assert_eq!(store.check_version(), VersionCheck::Compatible);
        assert_eq!(store.shared_dir_settings(), SharedDirSettings::default());
        assert_eq!(store.large_dir_threshold(), DEFAULT_LARGE_DIR_THRESHOLD);

        let config = store.load().unwrap().unwrap();
        assert_eq!(config.scan.total_directories, 0);
        assert_eq!(config.scan.total_size_bytes, 10);
        assert_eq!(config.migrate.transfer_flags, "-a");

        assert!(store.update_stats(&Statistics { total_directories: 2, ..Statistics::default() }).unwrap());
        assert_eq!(store.destination(), Some(PathBuf::from("/mnt/new")));
    }

    #[test]
    fn test_non_object_config_is_unreadable() {
        let tmp = tempdir().unwrap();
        let store = store_in(tmp.path());
        fs::write(store.path(), "[1, 2]").unwrap();
        assert!(store.load().is_err());
        assert_eq!(store.destination(), None);
    }

    #[test]
    fn test_initialize_stores_absolute_paths() {
        let tmp = tempdir().unwrap();
        let store = store_in(tmp.path());
        let source = tmp.path().join("home");
        fs::create_dir(&source).unwrap();

        store
            .initialize(&source, Path::new("freight-dest-not-created"))
            .unwrap();

        let dest = store.destination().unwrap();
        assert!(dest.is_absolute());
        assert_eq!(
            dest,
            std::env::current_dir().unwrap().join("freight-dest-not-created")
        );
        assert_eq!(store.migration_root(), Some(source.canonicalize().unwrap()));
    }

    #[test]
    fn test_record_phase_time() {
        let tmp = tempdir().unwrap();
        let store = store_in(tmp.path());
        store.ensure(Path::new("/srv"), None).unwrap();
        store.record_phase_time(Phase::Migrate).unwrap();

        let config = store.load().unwrap().unwrap();
        assert!(config.migrate.last_migrate_time.is_some());
        assert!(config.scan.last_scan_time.is_none());
    }

    #[test]
    fn test_large_dir_threshold() {
        let tmp = tempdir().unwrap();
        let store = store_in(tmp.path());
        assert_eq!(store.large_dir_threshold(), DEFAULT_LARGE_DIR_THRESHOLD);

        fs::write(store.path(), r#"{"migrate": {"large_dir_threshold_bytes": 1024}}"#).unwrap();
        assert_eq!(store.large_dir_threshold(), 1024);
    }
}
