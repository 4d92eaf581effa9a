use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{ReleaseError, Result};
use crate::gate::job::{CommandStep, JobContext};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How a single step ended
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Succeeded,
    /// Non-zero exit; `None` when the process was killed by a signal
    Failed { code: Option<i32> },
    /// The job deadline passed and the process was killed
    TimedOut,
}

/// Executes the commands of a gate job
pub struct CommandExecutor;

impl CommandExecutor {
    /// Execute a step with the job's environment
    ///
    /// The step's output goes straight to the terminal. If `deadline` passes
    /// before the process exits it is killed.
    ///
    /// # Returns
    /// * `Ok(StepOutcome)` - The process ran; its exit decides the outcome
    /// * `Err` - If the program could not be started
    pub fn execute(
        step: &CommandStep,
        context: &JobContext,
        workdir: Option<&Path>,
        deadline: Option<Instant>,
    ) -> Result<StepOutcome> {
        let mut cmd = Command::new(&step.program);
        cmd.args(&step.args)
            .envs(context.to_env_vars())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        if let Some(dir) = workdir {
            cmd.current_dir(dir);
        }

        // Own process group, so a timeout also reaches the processes the step starts
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        debug!(job = context.kind.name(), command = %step.display(), "starting step");

        let mut child = cmd.spawn().map_err(|e| {
            ReleaseError::job(format!("Failed to execute '{}': {}", step.display(), e))
        })?;

        let status = match deadline {
            None => child.wait()?,
            Some(deadline) => loop {
                if let Some(status) = child.try_wait()? {
                    break status;
                }
                if Instant::now() >= deadline {
                    warn!(job = context.kind.name(), command = %step.display(), "deadline reached, killing step");
                    kill_step(&mut child);
                    child.wait()?;
                    return Ok(StepOutcome::TimedOut);
                }
                thread::sleep(POLL_INTERVAL);
            },
        };

        Ok(outcome_of(status))
    }
}

/// Kill the step and everything it started.
///
/// Errors are ignored: the process may have exited between the poll and the kill.
#[cfg(unix)]
fn kill_step(child: &mut Child) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    if let Err(e) = killpg(Pid::from_raw(child.id() as i32), Signal::SIGKILL) {
        debug!(pid = child.id(), error = %e, "killpg failed, killing step only");
        let _ = child.kill();
    }
}

#[cfg(not(unix))]
fn kill_step(child: &mut Child) {
    let _ = child.kill();
}

fn outcome_of(status: ExitStatus) -> StepOutcome {
    if status.success() {
        StepOutcome::Succeeded
    } else {
        StepOutcome::Failed {
            code: status.code(),
        }
    }
}
