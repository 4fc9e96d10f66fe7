use std::env;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, error};

use crate::error::Error;

/// External collaborators invoked as opaque subprocesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Scan,
    Clean,
    Migrate,
}

impl Tool {
    pub fn name(&self) -> &'static str {
        match self {
            Tool::Scan => "scan",
            Tool::Clean => "clean",
            Tool::Migrate => "migrate",
        }
    }

    pub fn script_name(&self) -> String {
        format!("freight-{}.sh", self.name())
    }

    /// System executables the tool's script relies on.
    pub fn dependencies(&self) -> &'static [&'static str] {
        match self {
            Tool::Scan => &["jq", "du", "stat", "find", "realpath"],
            Tool::Clean => &["jq", "du", "find", "realpath"],
            Tool::Migrate => &["rsync", "jq", "realpath"],
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Exit-code-only result of one tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success() -> Self {
        Self {
            success: true,
            code: Some(0),
            stderr: String::new(),
        }
    }

    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            stderr: stderr.into(),
        }
    }

    /// Best available explanation of a failure.
    pub fn diagnostic(&self) -> String {
        let trimmed = self.stderr.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
        match self.code {
            Some(code) => format!("exited with code {}", code),
            None => "Unknown error".to_string(),
        }
    }
}

/// Capability for running the external scan/clean/migrate tools.
///
/// The orchestrator only depends on this trait so tests can substitute a
/// recording fake.
pub trait ToolRunner {
    /// Run `tool` with `args` and block until it exits.
    fn execute(&self, tool: Tool, args: &[OsString]) -> io::Result<ToolOutput>;

    /// Verify once, before any work, that `tool` can run at all.
    fn preflight(&self, _tool: Tool) -> Result<(), Error> {
        Ok(())
    }
}

/// Runs the `freight-<tool>.sh` scripts from a scripts directory.
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    scripts_dir: PathBuf,
}

impl ScriptRunner {
    pub fn new(scripts_dir: impl Into<PathBuf>) -> Self {
        Self {
            scripts_dir: scripts_dir.into(),
        }
    }

    pub fn script_path(&self, tool: Tool) -> PathBuf {
        self.scripts_dir.join(tool.script_name())
    }

    pub fn ensure_present(&self, tool: Tool) -> Result<PathBuf, Error> {
        let path = self.script_path(tool);
        if path.is_file() {
            Ok(path)
        } else {
            Err(Error::ToolNotFound(path))
        }
    }
}

impl ToolRunner for ScriptRunner {
    fn execute(&self, tool: Tool, args: &[OsString]) -> io::Result<ToolOutput> {
        let script = self.script_path(tool);
        debug!("Running {} {:?}", script.display(), args);

        // Scan output is noise; clean and migrate report progress the operator wants to see.
        let stdout = match tool {
            Tool::Scan => Stdio::null(),
            Tool::Clean | Tool::Migrate => Stdio::inherit(),
        };

        let output = Command::new(&script)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(stdout)
            .stderr(Stdio::piped())
            .output()?;

        Ok(ToolOutput {
            success: output.status.success(),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn preflight(&self, tool: Tool) -> Result<(), Error> {
        check_dependencies(tool.dependencies())?;
        self.ensure_present(tool)?;
        Ok(())
    }
}

/// Fail with every missing executable named, rather than the first one.
pub fn check_dependencies(deps: &[&str]) -> Result<(), Error> {
    let missing: Vec<String> = deps
        .iter()
        .filter(|dep| find_executable(dep).is_none())
        .map(|dep| dep.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        error!("Missing required dependencies: {}", missing.join(", "));
        Err(Error::MissingDependencies(missing))
    }
}

/// Look `name` up on `PATH`.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    find_executable_in(name, env::split_paths(&path))
}

fn find_executable_in<I>(name: &str, dirs: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = PathBuf>,
{
    dirs.into_iter()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Build an argument list from paths.
pub fn path_args(paths: &[&Path]) -> Vec<OsString> {
    paths.iter().map(|p| p.as_os_str().to_os_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_diagnostic_prefers_stderr() {
        assert_eq!(ToolOutput::failure(2, "  disk full\n").diagnostic(), "disk full");
        assert_eq!(ToolOutput::failure(3, "").diagnostic(), "exited with code 3");
        let killed = ToolOutput {
            success: false,
            code: None,
            stderr: String::new(),
        };
        assert_eq!(killed.diagnostic(), "Unknown error");
    }

    #[test]
    fn test_script_paths() {
        let runner = ScriptRunner::new("/opt/freight/scripts");
        assert_eq!(
            runner.script_path(Tool::Migrate),
            PathBuf::from("/opt/freight/scripts/freight-migrate.sh")
        );
    }

    #[test]
    fn test_ensure_present_missing_script() {
        let tmp = tempdir().unwrap();
        let runner = ScriptRunner::new(tmp.path());
        assert!(matches!(runner.ensure_present(Tool::Scan), Err(Error::ToolNotFound(_))));
    }

    #[test]
    fn test_missing_dependency_is_named() {
        let err = check_dependencies(&["freight-no-such-binary-xyz"]).unwrap_err();
        match err {
            Error::MissingDependencies(missing) => {
                assert_eq!(missing, vec!["freight-no-such-binary-xyz".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_find_executable_in_path_dirs() {
        use std::os::unix::fs::PermissionsExt;

        let plain = tempdir().unwrap();
        let bin = tempdir().unwrap();
        fs::write(plain.path().join("rsync"), "not executable").unwrap();
        fs::set_permissions(plain.path().join("rsync"), fs::Permissions::from_mode(0o644)).unwrap();
        fs::write(bin.path().join("rsync"), "#!/bin/sh\n").unwrap();
        fs::set_permissions(bin.path().join("rsync"), fs::Permissions::from_mode(0o755)).unwrap();

        let dirs = vec![plain.path().to_path_buf(), bin.path().to_path_buf()];
        assert_eq!(
            find_executable_in("rsync", dirs.clone()),
            Some(bin.path().join("rsync"))
        );
        assert_eq!(find_executable_in("rclone", dirs), None);
        assert_eq!(find_executable_in("rsync", vec![plain.path().to_path_buf()]), None);
    }
}
