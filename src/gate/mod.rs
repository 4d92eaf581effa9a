//! Pull-request gate
//!
//! Runs the test job and the lint job concurrently. Each job is a sequence
//! of commands judged only by exit code; the gate passes when every job
//! passes. Nothing is retried.

pub mod executor;
pub mod job;

pub use executor::{CommandExecutor, StepOutcome};
pub use job::{CommandStep, JobContext, JobKind, JobSpec};

use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{error, info, instrument};

use crate::config::GateConfig;

/// How a job ended
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Passed,
    /// A step exited unsuccessfully; later steps did not run
    Failed { step: String, code: Option<i32> },
    /// The job exceeded its time limit
    TimedOut { limit: Duration },
    /// A step could not be started
    Error(String),
}

impl JobOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, JobOutcome::Passed)
    }
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobOutcome::Passed => write!(f, "passed"),
            JobOutcome::Failed { step, code } => match code {
                Some(code) => write!(f, "'{}' exited with code {}", step, code),
                None => write!(f, "'{}' was terminated by a signal", step),
            },
            JobOutcome::TimedOut { limit } => {
                write!(f, "timed out after {}s", limit.as_secs())
            }
            JobOutcome::Error(message) => write!(f, "{}", message),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JobResult {
    pub kind: JobKind,
    pub outcome: JobOutcome,
    pub duration: Duration,
}

/// Outcome of every job of one gate run
#[derive(Debug, Clone)]
pub struct GateReport {
    pub jobs: Vec<JobResult>,
}

impl GateReport {
    /// The gate passes only if every job passed
    pub fn passed(&self) -> bool {
        self.jobs.iter().all(|job| job.outcome.is_passed())
    }

    pub fn outcome(&self, kind: JobKind) -> Option<&JobOutcome> {
        self.jobs
            .iter()
            .find(|job| job.kind == kind)
            .map(|job| &job.outcome)
    }
}

/// The standard test and lint jobs for a configuration
pub fn default_jobs(config: &GateConfig) -> Vec<JobSpec> {
    vec![JobSpec::test(config), JobSpec::lint(config)]
}

/// Run one job to completion, stopping at the first failing step.
#[instrument(skip(job), fields(kind = job.kind().name()))]
pub fn run_job(job: &JobSpec) -> JobOutcome {
    let deadline = job.timeout.map(|limit| Instant::now() + limit);

    for step in &job.steps {
        let outcome =
            CommandExecutor::execute(step, &job.context, job.workdir.as_deref(), deadline);

        match outcome {
            Ok(StepOutcome::Succeeded) => continue,
            Ok(StepOutcome::Failed { code }) => {
                return JobOutcome::Failed {
                    step: step.display(),
                    code,
                }
            }
            Ok(StepOutcome::TimedOut) => {
                return JobOutcome::TimedOut {
                    limit: job.timeout.unwrap_or_default(),
                }
            }
            Err(e) => return JobOutcome::Error(e.to_string()),
        }
    }

    JobOutcome::Passed
}

/// Run all jobs concurrently and collect their outcomes.
///
/// Jobs share nothing; one failing never stops another. Results are
/// reported in the order the jobs were given.
pub fn run_gate(jobs: &[JobSpec]) -> GateReport {
    let results = thread::scope(|scope| {
        let handles: Vec<_> = jobs
            .iter()
            .map(|job| {
                scope.spawn(move || {
                    let started = Instant::now();
                    let outcome = run_job(job);
                    (outcome, started.elapsed())
                })
            })
            .collect();

        handles
            .into_iter()
            .zip(jobs)
            .map(|(handle, job)| {
                let (outcome, duration) = handle.join().unwrap_or_else(|_| {
                    (JobOutcome::Error("job thread panicked".to_string()), Duration::ZERO)
                });
                JobResult {
                    kind: job.kind(),
                    outcome,
                    duration,
                }
            })
            .collect::<Vec<_>>()
    });

    for result in &results {
        if result.outcome.is_passed() {
            info!(job = result.kind.name(), elapsed_ms = result.duration.as_millis() as u64, "job passed");
        } else {
            error!(job = result.kind.name(), outcome = %result.outcome, "job failed");
        }
    }

    GateReport { jobs: results }
}
