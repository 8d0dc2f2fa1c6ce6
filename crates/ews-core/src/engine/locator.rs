use super::config::SolverSettings;
use super::error::EngineError;
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Read access to environment variables.
pub trait Environment {
    fn var_os(&self, key: &str) -> Option<OsString>;
}

/// The environment of the current process.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnvironment;

impl Environment for SystemEnvironment {
    fn var_os(&self, key: &str) -> Option<OsString> {
        std::env::var_os(key)
    }
}

impl Environment for HashMap<String, OsString> {
    fn var_os(&self, key: &str) -> Option<OsString> {
        self.get(key).cloned()
    }
}

/// A resolved solver executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverLocation {
    executable: PathBuf,
}

impl SolverLocation {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }
}

pub struct SolverLocator<'a, E: Environment = SystemEnvironment> {
    settings: &'a SolverSettings,
    env: E,
}

impl<'a> SolverLocator<'a, SystemEnvironment> {
    pub fn new(settings: &'a SolverSettings) -> Self {
        Self {
            settings,
            env: SystemEnvironment,
        }
    }
}

impl<'a, E: Environment> SolverLocator<'a, E> {
    pub fn with_environment(settings: &'a SolverSettings, env: E) -> Self {
        Self { settings, env }
    }

    /// Resolves the solver executable.
    ///
    /// When the configured environment variable is set it is the only candidate: a directory
    /// gets the executable name appended, a file is used as is. Otherwise every `PATH`
    /// directory is tried, followed by the configured search paths.
    pub fn locate(&self) -> Result<SolverLocation, EngineError> {
        if let Some(hint) = self.env.var_os(&self.settings.env_var) {
            let hint = PathBuf::from(hint);
            let candidate = if hint.is_dir() {
                hint.join(&self.settings.executable_name)
            } else {
                hint
            };
            debug!(
                "{} is set, using {}",
                self.settings.env_var,
                candidate.display()
            );
            return if is_executable(&candidate) {
                Ok(self.resolved(candidate))
            } else {
                Err(EngineError::ExecutableNotFound {
                    searched: vec![candidate],
                })
            };
        }

        let mut directories: Vec<PathBuf> = self
            .env
            .var_os("PATH")
            .map(|paths| std::env::split_paths(&paths).collect())
            .unwrap_or_default();
        directories.extend(self.settings.search_paths.iter().cloned());

        let mut searched = Vec::with_capacity(directories.len());
        for dir in directories {
            let candidate = dir.join(&self.settings.executable_name);
            if is_executable(&candidate) {
                return Ok(self.resolved(candidate));
            }
            searched.push(candidate);
        }
        Err(EngineError::ExecutableNotFound { searched })
    }

    fn resolved(&self, candidate: PathBuf) -> SolverLocation {
        let executable = std::path::absolute(&candidate).unwrap_or(candidate);
        info!("Using FEBio executable at {}", executable.display());
        SolverLocation::new(executable)
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
