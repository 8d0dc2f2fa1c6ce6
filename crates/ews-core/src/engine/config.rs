use std::num::NonZeroUsize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

pub const DEFAULT_ENV_VAR: &str = "FEBIO_PATH";
pub const DEFAULT_TAIL_LENGTH: u64 = 120;
const AUTO_BATCH_DEGREE: NonZeroUsize = NonZeroUsize::new(4).unwrap();

#[cfg(windows)]
pub const DEFAULT_EXECUTABLE_NAME: &str = "febio4.exe";
#[cfg(not(windows))]
pub const DEFAULT_EXECUTABLE_NAME: &str = "febio4";

#[cfg(windows)]
const DEFAULT_SEARCH_PATHS: &[&str] = &[
    r"C:\Program Files\FEBio\bin",
    r"C:\Program Files (x86)\FEBio\bin",
];
#[cfg(not(windows))]
const DEFAULT_SEARCH_PATHS: &[&str] = &["/usr/local/bin", "/opt/FEBio/bin"];

/// How the solver executable is found and how its logs are inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverSettings {
    /// File name looked up in the search directories, and appended when the environment
    /// variable names a directory.
    pub executable_name: String,
    /// Environment variable holding an explicit executable (or installation directory).
    pub env_var: String,
    /// Directories searched after the system `PATH`.
    pub search_paths: Vec<PathBuf>,
    /// Number of trailing log bytes inspected for the termination marker.
    pub tail_length: u64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            executable_name: DEFAULT_EXECUTABLE_NAME.to_string(),
            env_var: DEFAULT_ENV_VAR.to_string(),
            search_paths: DEFAULT_SEARCH_PATHS.iter().map(PathBuf::from).collect(),
            tail_length: DEFAULT_TAIL_LENGTH,
        }
    }
}

#[derive(Default)]
pub struct SolverSettingsBuilder {
    executable_name: Option<String>,
    env_var: Option<String>,
    search_paths: Option<Vec<PathBuf>>,
    tail_length: Option<u64>,
}

impl SolverSettingsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn executable_name(mut self, name: impl Into<String>) -> Self {
        self.executable_name = Some(name.into());
        self
    }
    pub fn env_var(mut self, name: impl Into<String>) -> Self {
        self.env_var = Some(name.into());
        self
    }
    pub fn search_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.search_paths = Some(paths);
        self
    }
    pub fn tail_length(mut self, bytes: u64) -> Self {
        self.tail_length = Some(bytes);
        self
    }

    /// Fills unset fields from [`SolverSettings::default`].
    pub fn build(self) -> Result<SolverSettings, ConfigError> {
        let defaults = SolverSettings::default();
        let settings = SolverSettings {
            executable_name: self.executable_name.unwrap_or(defaults.executable_name),
            env_var: self.env_var.unwrap_or(defaults.env_var),
            search_paths: self.search_paths.unwrap_or(defaults.search_paths),
            tail_length: self.tail_length.unwrap_or(defaults.tail_length),
        };

        if settings.executable_name.trim().is_empty() {
            return Err(ConfigError::InvalidParameter {
                name: "executable_name",
                reason: "must not be empty".into(),
            });
        }
        if settings.env_var.is_empty() || settings.env_var.contains(['=', '\0']) {
            return Err(ConfigError::InvalidParameter {
                name: "env_var",
                reason: format!("'{}' is not a valid variable name", settings.env_var),
            });
        }
        if settings.tail_length == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "tail_length",
                reason: "must be at least 1 byte".into(),
            });
        }
        Ok(settings)
    }
}

/// Number of simultaneous solver processes, and the thread budget each one receives.
///
/// FEBio parallelises internally through OpenMP. Either one process gets every hardware thread,
/// or several processes run side by side with a single thread each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParallelismPlan {
    degree: NonZeroUsize,
    threads_per_process: NonZeroUsize,
}

impl ParallelismPlan {
    pub fn new(degree: usize) -> Result<Self, ConfigError> {
        let degree = NonZeroUsize::new(degree).ok_or(ConfigError::InvalidParameter {
            name: "jobs",
            reason: "at least one solver process is required".into(),
        })?;
        Ok(Self::with_degree(degree))
    }

    /// One process for a single job, four otherwise.
    pub fn auto(job_count: usize) -> Self {
        if job_count <= 1 {
            Self::with_degree(NonZeroUsize::MIN)
        } else {
            Self::with_degree(AUTO_BATCH_DEGREE)
        }
    }

    fn with_degree(degree: NonZeroUsize) -> Self {
        let threads_per_process = if degree.get() == 1 {
            available_parallelism()
        } else {
            NonZeroUsize::MIN
        };
        Self {
            degree,
            threads_per_process,
        }
    }

    /// Interprets a user-supplied `--jobs` value, where 0 selects [`ParallelismPlan::auto`].
    pub fn from_request(requested: usize, job_count: usize) -> Self {
        match Self::new(requested) {
            Ok(plan) => plan,
            Err(_) => Self::auto(job_count),
        }
    }

    pub fn degree(&self) -> usize {
        self.degree.get()
    }

    pub fn threads_per_process(&self) -> usize {
        self.threads_per_process.get()
    }

    pub fn is_sequential(&self) -> bool {
        self.degree.get() == 1
    }
}

fn available_parallelism() -> NonZeroUsize {
    std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
}
