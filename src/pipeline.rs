//! Release pipeline
//!
//! Three stages run in a fixed order, each fed only the typed output of the
//! one before it:
//!
//! ```text
//! Triggered -> VersionExtracted -> ChangelogGenerated -> Published
//!     \________________\___________________\_______-> Failed(stage)
//! ```
//!
//! A failed stage ends the run; the stages after it are reported as skipped
//! and never invoked.

use std::fmt;
use std::path::PathBuf;

use tracing::{error, info, instrument};

use crate::changelog::{ChangelogGenerator, ChangelogOutput, DEFAULT_CHANGELOG_CONFIG};
use crate::config::{Config, PublishConfig};
use crate::error::{ReleaseError, Result};
use crate::git::Repository;
use crate::outputs::{StageOutputs, CONTENT_OUTPUT, VERSION_OUTPUT};
use crate::publish::{PublishedRelease, ReleasePublisher, ReleaseRequest};
use crate::version::{extract_version_checked, ReleaseVersion};
use crate::warnings::ReleaseWarning;

/// Stages of the release pipeline, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    VersionExtraction,
    ChangelogGeneration,
    Publish,
}

impl StageKind {
    pub const ALL: [StageKind; 3] = [
        StageKind::VersionExtraction,
        StageKind::ChangelogGeneration,
        StageKind::Publish,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StageKind::VersionExtraction => "version",
            StageKind::ChangelogGeneration => "changelog",
            StageKind::Publish => "publish",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reported result of one stage
#[derive(Debug, Clone, PartialEq)]
pub enum StageStatus {
    Succeeded,
    Failed(String),
    /// Not run because an earlier stage failed
    Skipped,
}

/// Where a pipeline run is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Triggered,
    VersionExtracted,
    ChangelogGenerated,
    Published,
    Failed(StageKind),
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Published | PipelineState::Failed(_))
    }

    /// The stage that runs next from this state, `None` once terminal
    pub fn next_stage(&self) -> Option<StageKind> {
        match self {
            PipelineState::Triggered => Some(StageKind::VersionExtraction),
            PipelineState::VersionExtracted => Some(StageKind::ChangelogGeneration),
            PipelineState::ChangelogGenerated => Some(StageKind::Publish),
            PipelineState::Published | PipelineState::Failed(_) => None,
        }
    }

    /// Transition taken when the next stage succeeds.
    ///
    /// # Returns
    /// * `Err` - If the state is terminal
    pub fn advance(self) -> Result<Self> {
        match self {
            PipelineState::Triggered => Ok(PipelineState::VersionExtracted),
            PipelineState::VersionExtracted => Ok(PipelineState::ChangelogGenerated),
            PipelineState::ChangelogGenerated => Ok(PipelineState::Published),
            terminal => Err(ReleaseError::stage(format!(
                "cannot advance from terminal state {:?}",
                terminal
            ))),
        }
    }

    /// Transition taken when the next stage fails.
    ///
    /// # Returns
    /// * `Err` - If the state is terminal
    pub fn fail(self) -> Result<Self> {
        match self.next_stage() {
            Some(stage) => Ok(PipelineState::Failed(stage)),
            None => Err(ReleaseError::stage(format!(
                "cannot fail from terminal state {:?}",
                self
            ))),
        }
    }
}

/// Settings a pipeline run needs besides its collaborators
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub changelog_config: PathBuf,
    pub latest_only: bool,
    pub strict_semver: bool,
    pub publish: PublishConfig,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        PipelineOptions {
            changelog_config: PathBuf::from(DEFAULT_CHANGELOG_CONFIG),
            latest_only: true,
            strict_semver: false,
            publish: PublishConfig::default(),
        }
    }
}

impl PipelineOptions {
    pub fn from_config(config: &Config) -> Self {
        PipelineOptions {
            changelog_config: config.changelog.config.clone(),
            latest_only: config.release.latest_only,
            strict_semver: config.release.strict_semver,
            publish: config.publish.clone(),
        }
    }
}

/// Everything a run produced, including how far it got
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub state: PipelineState,
    pub stages: Vec<(StageKind, StageStatus)>,
    pub version: Option<ReleaseVersion>,
    pub changelog: Option<ChangelogOutput>,
    pub release: Option<PublishedRelease>,
    pub warnings: Vec<ReleaseWarning>,
}

impl Default for PipelineReport {
    fn default() -> Self {
        PipelineReport {
            state: PipelineState::Triggered,
            stages: Vec::new(),
            version: None,
            changelog: None,
            release: None,
            warnings: Vec::new(),
        }
    }
}

impl PipelineReport {
    pub fn succeeded(&self) -> bool {
        self.state == PipelineState::Published
    }

    pub fn status(&self, stage: StageKind) -> Option<&StageStatus> {
        self.stages
            .iter()
            .find(|(kind, _)| *kind == stage)
            .map(|(_, status)| status)
    }

    fn complete(&mut self, stage: StageKind) -> Result<()> {
        if self.state.next_stage() != Some(stage) {
            return Err(ReleaseError::stage(format!(
                "stage '{}' completed out of order in state {:?}",
                stage, self.state
            )));
        }
        self.state = self.state.advance()?;
        self.stages.push((stage, StageStatus::Succeeded));
        Ok(())
    }

    fn abort(&mut self, stage: StageKind, message: String) -> Result<()> {
        if self.state.next_stage() != Some(stage) {
            return Err(ReleaseError::stage(format!(
                "stage '{}' failed out of order in state {:?}",
                stage, self.state
            )));
        }
        self.state = self.state.fail()?;
        self.stages.push((stage, StageStatus::Failed(message)));

        let skipped = StageKind::ALL
            .iter()
            .skip_while(|kind| **kind != stage)
            .skip(1);
        for kind in skipped {
            self.stages.push((*kind, StageStatus::Skipped));
        }
        Ok(())
    }
}

type StageFailure = (StageKind, ReleaseError);

/// Runs the release stages against a repository and a publisher.
pub struct ReleasePipeline<'a, R: Repository + ?Sized, P: ReleasePublisher + ?Sized> {
    repo: &'a R,
    publisher: &'a P,
    options: PipelineOptions,
    outputs: StageOutputs,
}

impl<'a, R: Repository + ?Sized, P: ReleasePublisher + ?Sized> ReleasePipeline<'a, R, P> {
    pub fn new(repo: &'a R, publisher: &'a P, options: PipelineOptions) -> Self {
        ReleasePipeline {
            repo,
            publisher,
            options,
            outputs: StageOutputs::default(),
        }
    }

    /// Also export stage results as named outputs
    pub fn with_outputs(mut self, outputs: StageOutputs) -> Self {
        self.outputs = outputs;
        self
    }

    /// Stage 1: derive the version from the triggering tag reference
    #[instrument(skip(self))]
    pub fn extract(&self, tag_ref: &str) -> Result<(ReleaseVersion, Vec<ReleaseWarning>)> {
        let (version, warnings) = extract_version_checked(tag_ref, self.options.strict_semver)?;
        self.outputs.set(VERSION_OUTPUT, version.as_str())?;
        info!(version = %version, "version extracted");
        Ok((version, warnings))
    }

    /// Stage 2: generate release notes scoped to `version`
    #[instrument(skip(self, version), fields(version = %version))]
    pub fn generate_changelog(&self, version: &ReleaseVersion) -> Result<ChangelogOutput> {
        let generator = ChangelogGenerator::from_file(&self.options.changelog_config)?;
        let output = generator.generate(self.repo, version, self.options.latest_only)?;
        self.outputs.set(CONTENT_OUTPUT, output.notes.as_str())?;
        info!(commits = output.commit_count, "changelog generated");
        Ok(output)
    }

    /// Stage 3: publish the release record
    #[instrument(skip(self, version, changelog), fields(version = %version))]
    pub fn publish(
        &self,
        version: &ReleaseVersion,
        changelog: &ChangelogOutput,
    ) -> Result<PublishedRelease> {
        let request = ReleaseRequest::new(version, &changelog.notes, &self.options.publish);
        let release = self.publisher.publish(&request)?;
        info!(id = release.id, url = %release.html_url, "release published");
        Ok(release)
    }

    /// Run all stages for a tag reference.
    ///
    /// Never panics on stage failure; the report records which stage failed
    /// and which were skipped.
    pub fn run(&self, tag_ref: &str) -> PipelineReport {
        let mut report = PipelineReport::default();

        if let Err((stage, e)) = self.run_stages(tag_ref, &mut report) {
            error!(stage = stage.name(), error = %e, "stage failed");
            if let Err(e) = report.abort(stage, e.to_string()) {
                error!(error = %e, "cannot record stage failure");
            }
        }

        report
    }

    fn run_stages(
        &self,
        tag_ref: &str,
        report: &mut PipelineReport,
    ) -> std::result::Result<(), StageFailure> {
        let stage = StageKind::VersionExtraction;
        let (version, warnings) = self.extract(tag_ref).map_err(|e| (stage, e))?;
        report.warnings.extend(warnings);
        report.version = Some(version.clone());
        report.complete(stage).map_err(|e| (stage, e))?;

        let stage = StageKind::ChangelogGeneration;
        let changelog = self.generate_changelog(&version).map_err(|e| (stage, e))?;
        report.warnings.extend(changelog.warnings.iter().cloned());
        report.changelog = Some(changelog.clone());
        report.complete(stage).map_err(|e| (stage, e))?;

        let stage = StageKind::Publish;
        let release = self.publish(&version, &changelog).map_err(|e| (stage, e))?;
        report.release = Some(release);
        report.complete(stage).map_err(|e| (stage, e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_machine_happy_path() {
        let state = PipelineState::Triggered;
        let state = state.advance().unwrap();
        assert_eq!(state, PipelineState::VersionExtracted);
        let state = state.advance().unwrap().advance().unwrap();
        assert_eq!(state, PipelineState::Published);
        assert!(state.is_terminal());
        assert!(state.advance().is_err());
    }

    #[test]
    fn test_failure_records_the_running_stage() {
        assert_eq!(
            PipelineState::VersionExtracted.fail().unwrap(),
            PipelineState::Failed(StageKind::ChangelogGeneration)
        );
        assert!(PipelineState::Failed(StageKind::Publish).fail().is_err());
        assert!(PipelineState::Published.fail().is_err());
    }

    #[test]
    fn test_abort_skips_later_stages() {
        let mut report = PipelineReport::default();
        report.complete(StageKind::VersionExtraction).unwrap();
        report
            .abort(StageKind::ChangelogGeneration, "bad config".to_string())
            .unwrap();

        assert_eq!(report.state, PipelineState::Failed(StageKind::ChangelogGeneration));
        assert_eq!(report.status(StageKind::Publish), Some(&StageStatus::Skipped));
        assert_eq!(
            report.status(StageKind::ChangelogGeneration),
            Some(&StageStatus::Failed("bad config".to_string()))
        );
    }

    #[test]
    fn test_out_of_order_completion_is_rejected() {
        let mut report = PipelineReport::default();
        assert!(report.complete(StageKind::Publish).is_err());
    }

    #[test]
    fn test_abort_follows_the_state_machine() {
        let mut report = PipelineReport::default();
        assert!(report
            .abort(StageKind::Publish, "too early".to_string())
            .is_err());
        assert_eq!(report.state, PipelineState::Triggered);
        assert!(report.stages.is_empty());

        report
            .abort(StageKind::VersionExtraction, "bad ref".to_string())
            .unwrap();
        assert_eq!(report.state, PipelineState::Failed(StageKind::VersionExtraction));
        assert!(report
            .abort(StageKind::ChangelogGeneration, "again".to_string())
            .is_err());
    }
}
