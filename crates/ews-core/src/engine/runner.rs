use super::config::{ParallelismPlan, SolverSettings};
use super::error::EngineError;
use super::locator::SolverLocation;
use super::progress::{Progress, ProgressReporter};
use super::termination::{TerminationClassifier, TerminationReport};
use crate::core::models::job::Job;
use std::process::{Command, Stdio};
use tracing::{debug, info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

const OMP_THREADS_VAR: &str = "OMP_NUM_THREADS";

/// A job together with the way its solver run ended.
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutcome {
    pub job: Job,
    pub report: TerminationReport,
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        self.report.is_success()
    }

    pub fn message(&self) -> String {
        self.report.message(&self.job.name())
    }
}

/// Runs FEBio over batches of input files.
#[derive(Debug, Clone)]
pub struct SolverRunner {
    location: SolverLocation,
    classifier: TerminationClassifier,
}

impl SolverRunner {
    pub fn new(location: SolverLocation, settings: &SolverSettings) -> Self {
        Self {
            location,
            classifier: TerminationClassifier::new(settings.tail_length),
        }
    }

    /// Runs the solver once per job and classifies every run.
    ///
    /// All processes are waited for before any log is inspected. Outcomes come back in the
    /// order of `jobs`; a run that failed to start or ended badly is an outcome, not an error.
    #[instrument(skip_all, name = "solver_batch", fields(jobs = jobs.len(), degree = plan.degree()))]
    pub fn run(
        &self,
        jobs: &[Job],
        plan: ParallelismPlan,
        reporter: &ProgressReporter,
    ) -> Result<Vec<JobOutcome>, EngineError> {
        if let Some(job) = jobs.iter().find(|job| !job.input().is_file()) {
            return Err(EngineError::MissingInput {
                path: job.input().to_path_buf(),
            });
        }

        info!(
            "Running {} job(s), {} at a time with {} solver thread(s) each",
            jobs.len(),
            plan.degree(),
            plan.threads_per_process()
        );

        reporter.phase("Running FEBio", || {
            reporter.report(Progress::TaskStart {
                total_steps: jobs.len() as u64,
            });
            let dispatched = self.dispatch(jobs, plan, reporter);
            reporter.report(Progress::TaskFinish);
            dispatched
        })?;

        let outcomes = jobs
            .iter()
            .map(|job| {
                let outcome = JobOutcome {
                    job: job.clone(),
                    report: self.classifier.classify(&job.log_path()),
                };
                if outcome.is_success() {
                    info!("{}", outcome.message());
                } else {
                    warn!("{}", outcome.message());
                }
                outcome
            })
            .collect::<Vec<_>>();

        info!(
            "{} of {} job(s) terminated normally",
            outcomes.iter().filter(|o| o.is_success()).count(),
            outcomes.len()
        );
        Ok(outcomes)
    }

    /// Runs the batch and keeps only the jobs that terminated normally, in input order.
    pub fn successful(
        &self,
        jobs: &[Job],
        plan: ParallelismPlan,
        reporter: &ProgressReporter,
    ) -> Result<Vec<Job>, EngineError> {
        Ok(self
            .run(jobs, plan, reporter)?
            .into_iter()
            .filter(JobOutcome::is_success)
            .map(|outcome| outcome.job)
            .collect())
    }

    fn dispatch(
        &self,
        jobs: &[Job],
        plan: ParallelismPlan,
        reporter: &ProgressReporter,
    ) -> Result<(), EngineError> {
        let threads = plan.threads_per_process();
        let execute = |job: &Job| {
            self.execute(job, threads);
            reporter.report(Progress::TaskIncrement);
        };

        if plan.is_sequential() {
            jobs.iter().for_each(execute);
            return Ok(());
        }

        #[cfg(feature = "parallel")]
        {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(plan.degree())
                .thread_name(|i| format!("febio-worker-{i}"))
                .build()
                .map_err(|e| EngineError::ThreadPool(e.to_string()))?;
            pool.install(|| jobs.par_iter().for_each(execute));
        }

        #[cfg(not(feature = "parallel"))]
        {
            use std::sync::atomic::{AtomicUsize, Ordering};
            let next = AtomicUsize::new(0);
            std::thread::scope(|scope| {
                for _ in 0..plan.degree().min(jobs.len()) {
                    scope.spawn(|| {
                        while let Some(job) = jobs.get(next.fetch_add(1, Ordering::Relaxed)) {
                            execute(job);
                        }
                    });
                }
            });
        }

        Ok(())
    }

    fn execute(&self, job: &Job, threads: usize) {
        debug!("Starting solver on {}", job.input().display());
        let status = Command::new(self.location.executable())
            .arg(job.input())
            .env(OMP_THREADS_VAR, threads.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) => debug!("Solver exited on {} with {}", job.name(), status),
            Err(e) => warn!("Failed to start solver on {}: {}", job.name(), e),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::engine::termination::TerminationOutcome;
    use std::fs;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // `/bin/sh <input>` runs the input itself, so every input file doubles as a fake solver
    // that writes `<stem>.log` next to itself.
    fn runner() -> SolverRunner {
        SolverRunner::new(SolverLocation::new("/bin/sh"), &SolverSettings::default())
    }

    fn normal_input(dir: &Path, stem: &str, seconds: &str) -> Job {
        let path = dir.join(format!("{stem}.feb"));
        let script = format!(
            "echo \"$OMP_NUM_THREADS\" > \"${{0%.*}}.threads\"\n\
             printf ' N O R M A L   T E R M I N A T I O N\\n Total elapsed time ..... : 0:00:01 ({seconds} sec)\\n' > \"${{0%.*}}.log\"\n"
        );
        fs::write(&path, script).unwrap();
        Job::new(path)
    }

    fn silent_input(dir: &Path, stem: &str) -> Job {
        let path = dir.join(format!("{stem}.feb"));
        fs::write(&path, "echo 'step 12 of 40 converged' > \"${0%.*}.log\"\n").unwrap();
        Job::new(path)
    }

    fn crashing_input(dir: &Path, stem: &str) -> Job {
        let path = dir.join(format!("{stem}.feb"));
        fs::write(&path, "exit 3\n").unwrap();
        Job::new(path)
    }

    #[test]
    fn jobs_without_a_marker_are_excluded_in_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let jobs = vec![
            normal_input(dir.path(), "one", "1.25"),
            silent_input(dir.path(), "two"),
            normal_input(dir.path(), "three", "2"),
        ];

        let plan = ParallelismPlan::new(4).unwrap();
        let successful = runner()
            .successful(&jobs, plan, &ProgressReporter::new())
            .unwrap();
        assert_eq!(successful, vec![jobs[0].clone(), jobs[2].clone()]);
    }

    #[test]
    fn outcomes_carry_reports_for_every_job() {
        let dir = tempfile::tempdir().unwrap();
        let jobs = vec![
            normal_input(dir.path(), "a", "0.5"),
            silent_input(dir.path(), "b"),
            crashing_input(dir.path(), "c"),
        ];

        let outcomes = runner()
            .run(&jobs, ParallelismPlan::new(2).unwrap(), &ProgressReporter::new())
            .unwrap();
        let kinds: Vec<_> = outcomes.iter().map(|o| o.report.outcome).collect();
        assert_eq!(
            kinds,
            vec![
                TerminationOutcome::NormalTermination,
                TerminationOutcome::NoTerminationFound,
                TerminationOutcome::NoLogFile,
            ]
        );
        assert_eq!(
            outcomes[0].message(),
            "a.feb terminated successfully in 0.5 seconds."
        );
        assert_eq!(
            outcomes[2].message(),
            "c.feb most likely didn't run (no log file found)."
        );
    }

    #[test]
    fn sequential_and_parallel_runs_agree() {
        let dir = tempfile::tempdir().unwrap();
        let jobs: Vec<Job> = (0..6)
            .map(|i| {
                if i % 3 == 1 {
                    silent_input(dir.path(), &format!("job{i}"))
                } else {
                    normal_input(dir.path(), &format!("job{i}"), "3")
                }
            })
            .collect();

        let sequential = runner()
            .successful(&jobs, ParallelismPlan::new(1).unwrap(), &ProgressReporter::new())
            .unwrap();
        let parallel = runner()
            .successful(&jobs, ParallelismPlan::new(3).unwrap(), &ProgressReporter::new())
            .unwrap();
        assert_eq!(sequential, parallel);
        assert_eq!(sequential.len(), 4);
    }

    #[test]
    fn thread_budget_follows_the_plan() {
        let dir = tempfile::tempdir().unwrap();
        let threads_of = |job: &Job| {
            fs::read_to_string(job.input().with_extension("threads"))
                .unwrap()
                .trim()
                .to_string()
        };

        let single = vec![normal_input(dir.path(), "solo", "1")];
        let plan = ParallelismPlan::new(1).unwrap();
        runner().run(&single, plan, &ProgressReporter::new()).unwrap();
        assert_eq!(threads_of(&single[0]), plan.threads_per_process().to_string());

        let batch = vec![
            normal_input(dir.path(), "p1", "1"),
            normal_input(dir.path(), "p2", "1"),
        ];
        runner()
            .run(&batch, ParallelismPlan::new(2).unwrap(), &ProgressReporter::new())
            .unwrap();
        assert!(batch.iter().all(|job| threads_of(job) == "1"));
    }

    // Each run marks itself started, then waits (bounded) until every run of the batch has
    // started and records how many it saw.
    fn rendezvous_input(dir: &Path, stem: &str, expected: usize) -> Job {
        let path = dir.join(format!("{stem}.feb"));
        let script = format!(
            ": > \"${{0%.*}}.started\"\n\
             n=0\n\
             i=0\n\
             while [ \"$i\" -lt 200 ]; do\n\
             \x20 n=$(ls \"${{0%/*}}\" | grep -c '\\.started$')\n\
             \x20 [ \"$n\" -ge {expected} ] && break\n\
             \x20 sleep 0.05\n\
             \x20 i=$((i + 1))\n\
             done\n\
             echo \"$n\" > \"${{0%.*}}.seen\"\n\
             printf ' N O R M A L   T E R M I N A T I O N\\n' > \"${{0%.*}}.log\"\n"
        );
        fs::write(&path, script).unwrap();
        Job::new(path)
    }

    #[test]
    fn concurrent_jobs_overlap() {
        let dir = tempfile::tempdir().unwrap();
        let jobs: Vec<Job> = ["r1", "r2", "r3"]
            .iter()
            .map(|stem| rendezvous_input(dir.path(), stem, 3))
            .collect();

        let successful = runner()
            .successful(&jobs, ParallelismPlan::new(4).unwrap(), &ProgressReporter::new())
            .unwrap();
        assert_eq!(successful.len(), 3);

        let seen: Vec<String> = jobs
            .iter()
            .map(|job| {
                fs::read_to_string(job.input().with_extension("seen"))
                    .unwrap()
                    .trim()
                    .to_string()
            })
            .collect();
        assert_eq!(seen, vec!["3", "3", "3"]);
    }

    #[test]
    fn progress_counts_every_finished_process() {
        let dir = tempfile::tempdir().unwrap();
        let jobs: Vec<Job> = (0..5)
            .map(|i| normal_input(dir.path(), &format!("n{i}"), "1"))
            .collect();
        let increments = AtomicUsize::new(0);
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if let Progress::TaskIncrement = event {
                increments.fetch_add(1, Ordering::SeqCst);
            }
        }));

        runner()
            .run(&jobs, ParallelismPlan::new(2).unwrap(), &reporter)
            .unwrap();
        assert_eq!(increments.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn missing_input_fails_before_anything_runs() {
        let dir = tempfile::tempdir().unwrap();
        let present = normal_input(dir.path(), "present", "1");
        let absent = Job::new(dir.path().join("absent.feb"));

        let result = runner().run(
            &[present.clone(), absent],
            ParallelismPlan::new(1).unwrap(),
            &ProgressReporter::new(),
        );
        assert!(matches!(result, Err(EngineError::MissingInput { .. })));
        assert!(!present.log_path().exists());
    }

    #[test]
    fn unstartable_solver_reports_no_log() {
        let dir = tempfile::tempdir().unwrap();
        let jobs = vec![normal_input(dir.path(), "x", "1")];
        let runner = SolverRunner::new(
            SolverLocation::new(dir.path().join("no-such-solver")),
            &SolverSettings::default(),
        );

        let outcomes = runner
            .run(&jobs, ParallelismPlan::new(1).unwrap(), &ProgressReporter::new())
            .unwrap();
        assert_eq!(outcomes[0].report.outcome, TerminationOutcome::NoLogFile);
    }
}
