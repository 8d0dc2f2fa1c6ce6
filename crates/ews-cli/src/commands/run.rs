use crate::cli::SimulateArgs;
use crate::config::AppConfig;
use crate::error::Result;
use tracing::{info, warn};

pub fn run(args: &SimulateArgs, config: &AppConfig) -> Result<()> {
    let batch = super::fem::run(args, config)?;

    let successful = batch.successful_inputs();
    if successful.is_empty() {
        warn!("No simulation terminated normally; nothing to convert.");
        println!("Warning: no simulation terminated normally, nothing to convert.");
        return Ok(());
    }

    info!("Converting {} successful simulation(s).", successful.len());
    super::convert::run(&successful)
}
