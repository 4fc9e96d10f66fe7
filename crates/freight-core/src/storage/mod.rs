pub mod artifacts;
pub mod global_config;
pub mod models;

pub use artifacts::{ArtifactLoad, INFRA_DIR};
pub use global_config::{ConfigStore, GlobalConfig, Phase, VersionCheck, ENGINE_VERSION};
pub use models::{CleanPattern, CleanRecord, ScanRecord};
