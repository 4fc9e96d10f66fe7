use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Directory not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("No migration root specified and no global config found")]
    NoMigrationRoot,

    #[error("Destination path is not configured")]
    DestinationNotConfigured,

    #[error("No directories with scan data found")]
    NoScanData,

    #[error("Freight has already been initialized: {}", .0.display())]
    AlreadyInitialized(PathBuf),

    #[error("Missing required dependencies: {}", .0.join(", "))]
    MissingDependencies(Vec<String>),

    #[error("Tool script not found: {}", .0.display())]
    ToolNotFound(PathBuf),
}

impl Error {
    /// Operator-facing hint for recovering from a fatal error.
    pub fn remediation(&self) -> Option<String> {
        match self {
            Error::NoMigrationRoot => Some(
                "Run `freight init` first or specify a migration root explicitly.".to_string(),
            ),
            Error::DestinationNotConfigured => Some(
                "Set `dest_path` in the global config or re-run `freight init`.".to_string(),
            ),
            Error::NoScanData => Some("Run `freight scan` before migrating.".to_string()),
            Error::AlreadyInitialized(path) => Some(format!(
                "Edit the existing config, or back it up and reinitialize:\n    mv {0} {0}.backup\n    freight init",
                path.display()
            )),
            Error::MissingDependencies(_) => {
                Some("Install the missing dependencies and try again.".to_string())
            }
            Error::ToolNotFound(_) => {
                Some("Set FREIGHT_SCRIPTS_DIR to the directory holding the freight scripts.".to_string())
            }
            _ => None,
        }
    }
}
