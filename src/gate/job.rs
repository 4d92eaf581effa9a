use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::GateConfig;

/// Jobs run by the pull-request gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobKind {
    Test,
    Lint,
}

impl JobKind {
    /// Get the job name as a string
    pub fn name(&self) -> &'static str {
        match self {
            JobKind::Test => "test",
            JobKind::Lint => "lint",
        }
    }
}

/// One command of a job
#[derive(Debug, Clone, PartialEq)]
pub struct CommandStep {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandStep {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandStep {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Command line for logs and error messages
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Context information passed to every step of a job
#[derive(Debug, Clone)]
pub struct JobContext {
    /// Job the step belongs to
    pub kind: JobKind,
    /// Toolchain channel selected for the job
    pub toolchain: String,
    /// Upgrade compiler warnings to errors for the whole job
    pub deny_warnings: bool,
}

impl JobContext {
    /// Convert context to environment variables for the job's commands
    ///
    /// Maps context fields to GITRELEASE_* environment variables; `deny_warnings`
    /// sets `RUSTFLAGS=-Dwarnings`.
    pub fn to_env_vars(&self) -> HashMap<String, String> {
        let mut env = HashMap::new();

        env.insert("GITRELEASE_JOB".to_string(), self.kind.name().to_string());
        env.insert("GITRELEASE_TOOLCHAIN".to_string(), self.toolchain.clone());

        if self.deny_warnings {
            env.insert("RUSTFLAGS".to_string(), "-Dwarnings".to_string());
        }

        env
    }
}

/// A gate job: a sequence of steps that must all succeed
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub context: JobContext,
    pub steps: Vec<CommandStep>,
    pub timeout: Option<Duration>,
    pub workdir: Option<PathBuf>,
}

impl JobSpec {
    pub fn new(context: JobContext, steps: Vec<CommandStep>) -> Self {
        JobSpec {
            context,
            steps,
            timeout: None,
            workdir: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    pub fn kind(&self) -> JobKind {
        self.context.kind
    }

    /// Test job: optional toolchain install, then `cargo +<channel> test`
    pub fn test(config: &GateConfig) -> Self {
        let context = JobContext {
            kind: JobKind::Test,
            toolchain: config.test_toolchain.clone(),
            deny_warnings: false,
        };
        let steps = cargo_steps(config.install_toolchain, &context.toolchain, None, &config.test_args);
        JobSpec::new(context, steps)
    }

    /// Lint job: like the test job with clippy, warnings denied and a time limit
    pub fn lint(config: &GateConfig) -> Self {
        let context = JobContext {
            kind: JobKind::Lint,
            toolchain: config.lint_toolchain.clone(),
            deny_warnings: true,
        };
        let steps = cargo_steps(
            config.install_toolchain,
            &context.toolchain,
            Some("clippy"),
            &config.lint_args,
        );
        JobSpec::new(context, steps).with_timeout(Duration::from_secs(config.lint_timeout_secs))
    }
}

fn cargo_steps(
    install: bool,
    toolchain: &str,
    component: Option<&str>,
    cargo_args: &[String],
) -> Vec<CommandStep> {
    let mut steps = Vec::new();

    if install {
        let mut args = vec![
            "toolchain".to_string(),
            "install".to_string(),
            toolchain.to_string(),
            "--profile".to_string(),
            "minimal".to_string(),
        ];
        if let Some(component) = component {
            args.push("--component".to_string());
            args.push(component.to_string());
        }
        steps.push(CommandStep::new("rustup", args));
    }

    let args = std::iter::once(format!("+{}", toolchain)).chain(cargo_args.iter().cloned());
    steps.push(CommandStep::new("cargo", args));
    steps
}
