use crate::cli::SimulateArgs;
use crate::config::AppConfig;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use ewsfem::engine::config::ParallelismPlan;
use ewsfem::engine::locator::SolverLocator;
use ewsfem::engine::progress::ProgressReporter;
use ewsfem::workflows::simulate::{self, SimulationBatch};
use std::collections::HashMap;
use tracing::info;

pub fn run(args: &SimulateArgs, config: &AppConfig) -> Result<SimulationBatch> {
    let plan = ParallelismPlan::from_request(config.jobs, args.files.len());
    info!(
        "Simulating {} file(s) with {} concurrent FEBio process(es).",
        args.files.len(),
        plan.degree()
    );

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    let batch = match &config.executable {
        Some(executable) => {
            // An explicit executable behaves exactly like the environment variable pointing at it.
            let hint = HashMap::from([(
                config.settings.env_var.clone(),
                executable.clone().into_os_string(),
            )]);
            let location = SolverLocator::with_environment(&config.settings, hint).locate()?;
            simulate::run_with_solver(&args.files, plan, location, &config.settings, &reporter)?
        }
        None => simulate::run(&args.files, plan, &config.settings, &reporter)?,
    };

    for outcome in &batch.outcomes {
        let marker = if outcome.is_success() { "✓" } else { "✗" };
        println!("{} {}", marker, outcome.message());
    }
    println!(
        "{} of {} simulation(s) terminated normally.",
        batch.outcomes.len() - batch.failed_count(),
        batch.outcomes.len()
    );

    Ok(batch)
}
