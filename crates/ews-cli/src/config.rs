use crate::cli::{Cli, Commands};
use crate::error::{CliError, Result};
use ewsfem::engine::config::{SolverSettings, SolverSettingsBuilder};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialSolverSection {
    executable: Option<PathBuf>,
    #[serde(rename = "executable-name")]
    executable_name: Option<String>,
    #[serde(rename = "env-var")]
    env_var: Option<String>,
    #[serde(rename = "search-paths")]
    search_paths: Option<Vec<PathBuf>>,
    #[serde(rename = "tail-length")]
    tail_length: Option<u64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialRunnerSection {
    jobs: Option<usize>,
}

/// Contents of the optional TOML configuration file; every key may be omitted.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialSolverConfig {
    solver: Option<PartialSolverSection>,
    runner: Option<PartialRunnerSection>,
}

/// Settings after merging defaults, the config file and the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub settings: SolverSettings,
    /// Explicit solver executable or installation directory, bypassing the environment lookup.
    pub executable: Option<PathBuf>,
    /// Requested number of simultaneous solver processes, 0 for automatic.
    pub jobs: usize,
}

impl PartialSolverConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Loads the file named by `--config`, or an empty configuration when there is none.
    pub fn load(cli: &Cli) -> Result<Self> {
        match &cli.config {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn merge_with_cli(self, cli: &Cli) -> Result<AppConfig> {
        let solver = self.solver.unwrap_or_default();
        let runner = self.runner.unwrap_or_default();

        let mut builder = SolverSettingsBuilder::new();
        if let Some(name) = solver.executable_name {
            builder = builder.executable_name(name);
        }
        if let Some(var) = solver.env_var {
            builder = builder.env_var(var);
        }
        if let Some(paths) = solver.search_paths {
            builder = builder.search_paths(paths);
        }
        if let Some(bytes) = solver.tail_length {
            builder = builder.tail_length(bytes);
        }
        let settings = builder
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?;

        let cli_jobs = match &cli.command {
            Commands::Fem(args) | Commands::Run(args) => args.jobs,
            Commands::Convert(_) => None,
        };

        let config = AppConfig {
            settings,
            executable: cli.febio.clone().or(solver.executable),
            jobs: cli_jobs.or(runner.jobs).unwrap_or(0),
        };
        debug!("Effective configuration: {:?}", config);
        Ok(config)
    }
}
