use super::ensure_feb_extension;
use crate::core::models::job::Job;
use crate::engine::config::{ParallelismPlan, SolverSettings};
use crate::engine::error::EngineError;
use crate::engine::locator::{SolverLocation, SolverLocator};
use crate::engine::progress::ProgressReporter;
use crate::engine::runner::{JobOutcome, SolverRunner};
use std::path::{Path, PathBuf};
use tracing::instrument;

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationBatch {
    pub outcomes: Vec<JobOutcome>,
}

impl SimulationBatch {
    /// Jobs that terminated normally, in input order.
    pub fn successful(&self) -> impl Iterator<Item = &Job> {
        self.outcomes
            .iter()
            .filter(|o| o.is_success())
            .map(|o| &o.job)
    }

    pub fn successful_inputs(&self) -> Vec<PathBuf> {
        self.successful().map(|job| job.input().to_path_buf()).collect()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_success()).count()
    }
}

/// Locates FEBio through `settings` and runs it over `inputs`.
#[instrument(skip_all, name = "simulate_workflow")]
pub fn run<P: AsRef<Path>>(
    inputs: &[P],
    plan: ParallelismPlan,
    settings: &SolverSettings,
    reporter: &ProgressReporter,
) -> Result<SimulationBatch, EngineError> {
    let jobs = validate_inputs(inputs)?;
    let location = SolverLocator::new(settings).locate()?;
    run_jobs(&jobs, plan, location, settings, reporter)
}

/// Runs an explicitly chosen solver executable over `inputs`.
#[instrument(skip_all, name = "simulate_workflow")]
pub fn run_with_solver<P: AsRef<Path>>(
    inputs: &[P],
    plan: ParallelismPlan,
    location: SolverLocation,
    settings: &SolverSettings,
    reporter: &ProgressReporter,
) -> Result<SimulationBatch, EngineError> {
    let jobs = validate_inputs(inputs)?;
    run_jobs(&jobs, plan, location, settings, reporter)
}

fn validate_inputs<P: AsRef<Path>>(inputs: &[P]) -> Result<Vec<Job>, EngineError> {
    inputs
        .iter()
        .map(|input| -> Result<Job, EngineError> {
            let path = input.as_ref();
            ensure_feb_extension(path)?;
            Ok(Job::new(path))
        })
        .collect()
}

fn run_jobs(
    jobs: &[Job],
    plan: ParallelismPlan,
    location: SolverLocation,
    settings: &SolverSettings,
    reporter: &ProgressReporter,
) -> Result<SimulationBatch, EngineError> {
    let runner = SolverRunner::new(location, settings);
    let outcomes = runner.run(jobs, plan, reporter)?;
    Ok(SimulationBatch { outcomes })
}
