use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use git_release::changelog::{ChangelogGenerator, ReleaseNotes};
use git_release::config::{self, Config};
use git_release::gate::{self, JobKind, JobSpec};
use git_release::git::Git2Repository;
use git_release::outputs::{StageOutputs, CONTENT_OUTPUT, VERSION_OUTPUT};
use git_release::pipeline::{PipelineOptions, ReleasePipeline};
use git_release::publish::{
    DryRunPublisher, GitHubPublisher, ReleasePublisher, ReleaseRequest,
};
use git_release::ui;
use git_release::version::{extract_version_checked, ReleaseVersion};

#[derive(Parser)]
#[command(
    name = "git-release",
    version,
    about = "Cut releases from version tags and gate pull requests"
)]
struct Args {
    #[arg(short, long, global = true, help = "Custom configuration file path")]
    config: Option<PathBuf>,

    #[arg(short, long, global = true, action = ArgAction::Count, help = "Increase log verbosity")]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the release version derived from a tag reference
    Version {
        #[arg(long = "ref", env = "GITHUB_REF", help = "Tag reference, e.g. refs/tags/v1.2.3")]
        tag_ref: String,

        #[arg(long, help = "Reject versions that are not semantic versions")]
        strict: bool,
    },

    /// Generate release notes for a version
    Changelog {
        #[arg(long, help = "Version to scope the notes to")]
        tag: String,

        #[arg(long, help = "Changelog configuration (default: cliff.toml)")]
        cliff: Option<PathBuf>,

        #[arg(long, help = "Include the whole history instead of the latest release only")]
        all: bool,

        #[arg(short, long, help = "Write the notes to a file instead of stdout")]
        output: Option<PathBuf>,
    },

    /// Publish a release with the given notes
    Publish {
        #[arg(long, help = "Version used as tag and release name")]
        tag: String,

        #[arg(long, conflicts_with = "notes", help = "File holding the release notes")]
        notes_file: Option<PathBuf>,

        #[arg(long, help = "Release notes text")]
        notes: Option<String>,

        #[arg(long, help = "Log the release instead of publishing it")]
        dry_run: bool,
    },

    /// Run the full release pipeline for a tag reference
    Release {
        #[arg(long = "ref", env = "GITHUB_REF", help = "Tag reference, e.g. refs/tags/v1.2.3")]
        tag_ref: String,

        #[arg(long, help = "Run every stage but do not publish")]
        dry_run: bool,
    },

    /// Run the pull-request gate: tests and lints in parallel
    Gate {
        #[arg(long, value_enum, help = "Run a single job")]
        only: Option<GateJob>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum GateJob {
    Test,
    Lint,
}

impl From<GateJob> for JobKind {
    fn from(job: GateJob) -> Self {
        match job {
            GateJob::Test => JobKind::Test,
            GateJob::Lint => JobKind::Lint,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    ui::init_tracing(args.verbose);

    let config = match config::load_config(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            ui::display_error(&format!("Error loading config: {}", e));
            std::process::exit(1);
        }
    };

    let outputs = StageOutputs::from_env();

    match args.command {
        Command::Version { tag_ref, strict } => {
            let strict = strict || config.release.strict_semver;
            let (version, warnings) = match extract_version_checked(&tag_ref, strict) {
                Ok(extracted) => extracted,
                Err(e) => {
                    ui::display_error(&e.to_string());
                    std::process::exit(1);
                }
            };
            warnings.iter().for_each(ui::display_warning);
            outputs.set(VERSION_OUTPUT, version.as_str())?;
            println!("{}", version);
        }
        Command::Changelog {
            tag,
            cliff,
            all,
            output,
        } => {
            let cliff = cliff.unwrap_or_else(|| config.changelog.config.clone());
            let latest_only = !all && config.release.latest_only;
            let notes = match generate_notes(&tag, &cliff, latest_only) {
                Ok(notes) => notes,
                Err(e) => {
                    ui::display_error(&format!("{:#}", e));
                    std::process::exit(1);
                }
            };
            outputs.set(CONTENT_OUTPUT, notes.as_str())?;
            match output {
                Some(path) => fs::write(&path, notes.as_str())
                    .with_context(|| format!("cannot write '{}'", path.display()))?,
                None => print!("{}", notes),
            }
        }
        Command::Publish {
            tag,
            notes_file,
            notes,
            dry_run,
        } => {
            let body = match (notes_file, notes) {
                (Some(path), _) => fs::read_to_string(&path)
                    .with_context(|| format!("cannot read '{}'", path.display()))?,
                (None, Some(text)) => text,
                (None, None) => String::new(),
            };
            if let Err(e) = publish(&config, &tag, body, dry_run) {
                ui::display_error(&format!("{:#}", e));
                std::process::exit(1);
            }
        }
        Command::Release { tag_ref, dry_run } => {
            if !run_release(&config, &tag_ref, dry_run, outputs)? {
                std::process::exit(1);
            }
        }
        Command::Gate { only } => {
            let jobs: Vec<JobSpec> = gate::default_jobs(&config.gate)
                .into_iter()
                .filter(|job| only.map_or(true, |only| job.kind() == JobKind::from(only)))
                .collect();

            ui::display_status(&format!(
                "Running {} job(s): {}",
                jobs.len(),
                jobs.iter()
                    .map(|job| job.kind().name())
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
            let report = gate::run_gate(&jobs);
            ui::display_gate_report(&report);

            if !report.passed() {
                ui::display_error("Pull request gate failed");
                std::process::exit(1);
            }
            ui::display_success("Pull request gate passed");
        }
    }

    Ok(())
}

fn generate_notes(tag: &str, cliff: &std::path::Path, latest_only: bool) -> Result<ReleaseNotes> {
    let repo = Git2Repository::open(".").context("not in a git repository")?;
    let generator = ChangelogGenerator::from_file(cliff)?;
    let output = generator.generate(&repo, &ReleaseVersion::new(tag), latest_only)?;
    output.warnings.iter().for_each(ui::display_warning);
    Ok(output.notes)
}

fn publish(config: &Config, tag: &str, body: String, dry_run: bool) -> Result<()> {
    let version = ReleaseVersion::new(tag);
    let notes = ReleaseNotes::new(body);
    let request = ReleaseRequest::new(&version, &notes, &config.publish);

    let release = if dry_run {
        DryRunPublisher.publish(&request)?
    } else {
        let repo = Git2Repository::open(".").context("not in a git repository")?;
        GitHubPublisher::from_config(&config.publish, &repo)?.publish(&request)?
    };

    if release.html_url.is_empty() {
        ui::display_success(&format!("Release {} ready (dry run)", release.tag_name));
    } else {
        ui::display_success(&format!("Published {}: {}", release.tag_name, release.html_url));
    }
    Ok(())
}

/// Runs the pipeline and reports; `Ok(false)` when a stage failed.
fn run_release(config: &Config, tag_ref: &str, dry_run: bool, outputs: StageOutputs) -> Result<bool> {
    let repo = Git2Repository::open(".").context("not in a git repository")?;

    let publisher: Box<dyn ReleasePublisher> = if dry_run {
        Box::new(DryRunPublisher)
    } else {
        // Token and repository problems surface before any stage runs
        Box::new(GitHubPublisher::from_config(&config.publish, &repo)?)
    };

    ui::display_status(&format!("Releasing from {}", tag_ref));
    let pipeline = ReleasePipeline::new(&repo, publisher.as_ref(), PipelineOptions::from_config(config))
        .with_outputs(outputs);
    let report = pipeline.run(tag_ref);

    report.warnings.iter().for_each(ui::display_warning);
    ui::display_stage_report(&report);

    if !report.succeeded() {
        ui::display_error("Release pipeline failed");
    }
    Ok(report.succeeded())
}
