use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

/// Where the engine finds its global config and tool scripts.
///
/// Read from an optional `Freight.toml` in the working directory, then
/// `FREIGHT_*` environment variables. Both paths default to locations next to
/// the running executable.
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    pub config_path: PathBuf,
    pub scripts_dir: PathBuf,
}

pub fn load_settings() -> Result<AppSettings, ConfigError> {
    load_settings_from(&install_dir())
}

pub fn load_settings_from(base: &Path) -> Result<AppSettings, ConfigError> {
    let builder = Config::builder()
        .set_default("config_path", base.join("config.json").to_string_lossy().into_owned())?
        .set_default("scripts_dir", base.join("scripts").to_string_lossy().into_owned())?
        .add_source(ConfigFile::with_name("Freight").required(false))
        .add_source(Environment::with_prefix("FREIGHT"))
        .build()?;
    builder.try_deserialize::<AppSettings>()
}

fn install_dir() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Make `path` absolute without requiring it to exist.
pub fn resolve_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}
