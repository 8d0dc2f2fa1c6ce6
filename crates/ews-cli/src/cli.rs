use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "EWS FEM pipeline contributors",
    version,
    about = "EWS FEM - Runs FEBio simulations in batches and converts their output frames into surface displacement arrays for animation.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Path to a configuration file in TOML format
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// FEBio executable, or the directory containing it.
    /// Takes precedence over the FEBIO_PATH environment variable and the config file.
    #[arg(long, global = true, value_name = "PATH")]
    pub febio: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run FEBio on one or more .feb input files.
    Fem(SimulateArgs),
    /// Convert the output frames of finished simulations into .obj and .npy files.
    Convert(ConvertArgs),
    /// Run FEBio, then convert every simulation that terminated normally.
    Run(SimulateArgs),
}

/// Arguments for the `fem` and `run` subcommands.
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// FEBio input files (.feb).
    #[arg(required = true, num_args = 1.., value_name = "FILES")]
    pub files: Vec<PathBuf>,

    /// Number of FEBio processes to run at the same time.
    /// 0 picks automatically: 1 for a single file, 4 otherwise.
    #[arg(short = 'j', long, value_name = "NUM")]
    pub jobs: Option<usize>,
}

/// Arguments for the `convert` subcommand.
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// FEBio input files (.feb) whose output frames should be converted.
    #[arg(required = true, num_args = 1.., value_name = "FILES")]
    pub files: Vec<PathBuf>,
}
