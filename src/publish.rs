//! Release publishing
//!
//! Creates the externally visible release record. The version is both the
//! display name and the lookup key: an existing release for the tag is
//! updated in place, otherwise a new one is created.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::changelog::ReleaseNotes;
use crate::config::PublishConfig;
use crate::error::{ReleaseError, Result};
use crate::git::Repository;
use crate::version::ReleaseVersion;

const USER_AGENT: &str = concat!("git-release/", env!("CARGO_PKG_VERSION"));

/// Payload sent to the release service
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReleaseRequest {
    pub tag_name: String,
    pub name: String,
    pub body: String,
    pub draft: bool,
    pub prerelease: bool,
}

impl ReleaseRequest {
    /// Builds a request that uses the version as tag and display name.
    pub fn new(version: &ReleaseVersion, notes: &ReleaseNotes, config: &PublishConfig) -> Self {
        ReleaseRequest {
            tag_name: version.to_string(),
            name: version.to_string(),
            body: notes.to_string(),
            draft: config.draft,
            prerelease: config.prerelease || version.is_prerelease(),
        }
    }
}

/// The published release record
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedRelease {
    pub id: u64,
    pub tag_name: String,
    pub html_url: String,
    /// `false` when an existing release for the tag was updated
    pub created: bool,
}

/// Something that can publish a release record.
pub trait ReleasePublisher {
    fn publish(&self, request: &ReleaseRequest) -> Result<PublishedRelease>;
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ReleaseResponse {
    id: u64,
    tag_name: String,
    #[serde(default)]
    html_url: String,
}

/// Publishes releases through the GitHub REST API.
pub struct GitHubPublisher {
    client: Client,
    api_url: Url,
    repository: String,
    token: String,
}

impl GitHubPublisher {
    /// Create a publisher for `repository` ("owner/name").
    ///
    /// # Returns
    /// * `Err` - If `api_url` is not a usable base URL or the client cannot be built
    pub fn new(
        api_url: &str,
        repository: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self> {
        let api_url = Url::parse(api_url)
            .map_err(|e| ReleaseError::config(format!("invalid API URL '{}': {}", api_url, e)))?;
        if api_url.cannot_be_a_base() {
            return Err(ReleaseError::config(format!(
                "API URL '{}' cannot be used as a base",
                api_url
            )));
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        Ok(GitHubPublisher {
            client,
            api_url,
            repository: repository.into(),
            token: token.into(),
        })
    }

    /// Create a publisher from configuration, the environment and the repository remotes.
    ///
    /// # Returns
    /// * `Err` - If the token variable is unset or the repository cannot be determined
    pub fn from_config<R: Repository + ?Sized>(config: &PublishConfig, repo: &R) -> Result<Self> {
        let token = std::env::var(&config.token_env)
            .ok()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ReleaseError::config(format!(
                    "release token not found in environment variable '{}'",
                    config.token_env
                ))
            })?;

        let repository = resolve_repository(config, repo)?;
        Self::new(&config.api_url, repository, token)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    /// `<api_url>/repos/<owner>/<name>/<segments...>`, each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| ReleaseError::config(format!("API URL '{}' cannot be used as a base", self.api_url)))?
            .pop_if_empty()
            .push("repos")
            .extend(self.repository.split('/'))
            .extend(segments);
        Ok(url)
    }

    fn find_release(&self, tag: &str) -> Result<Option<ReleaseResponse>> {
        let url = self.endpoint(&["releases", "tags", tag])?;
        debug!("Looking up release at {}", url);

        let response = self.authorized(self.client.get(url)).send()?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        Ok(Some(parse_response(response)?))
    }
}

impl ReleasePublisher for GitHubPublisher {
    #[instrument(skip(self, request), fields(repository = %self.repository, tag = %request.tag_name))]
    fn publish(&self, request: &ReleaseRequest) -> Result<PublishedRelease> {
        let (response, created) = match self.find_release(&request.tag_name)? {
            Some(existing) => {
                info!(id = existing.id, "updating existing release");
                let url = self.endpoint(&["releases", existing.id.to_string().as_str()])?;
                let response = self
                    .authorized(self.client.patch(url))
                    .json(request)
                    .send()?;
                (parse_response(response)?, false)
            }
            None => {
                info!("creating release");
                let url = self.endpoint(&["releases"])?;
                let response = self
                    .authorized(self.client.post(url))
                    .json(request)
                    .send()?;
                (parse_response(response)?, true)
            }
        };

        Ok(PublishedRelease {
            id: response.id,
            tag_name: response.tag_name,
            html_url: response.html_url,
            created,
        })
    }
}

fn parse_response(response: Response) -> Result<ReleaseResponse> {
    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().unwrap_or_default();
        return Err(ReleaseError::publish(format!(
            "release service returned {}: {}",
            status.as_u16(),
            error_detail(&error_text)
        )));
    }

    Ok(response.json()?)
}

/// The `message` of an API error body, or the raw body when it is not JSON.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<ApiError>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

/// Logs the release instead of publishing it.
#[derive(Debug, Default)]
pub struct DryRunPublisher;

impl ReleasePublisher for DryRunPublisher {
    fn publish(&self, request: &ReleaseRequest) -> Result<PublishedRelease> {
        info!(
            tag = %request.tag_name,
            body_len = request.body.len(),
            draft = request.draft,
            prerelease = request.prerelease,
            "dry run: release not published"
        );

        Ok(PublishedRelease {
            id: 0,
            tag_name: request.tag_name.clone(),
            html_url: String::new(),
            created: true,
        })
    }
}

/// Determines the "owner/name" repository to publish to.
///
/// Resolution order:
/// 1. `repository` from configuration
/// 2. `GITHUB_REPOSITORY` environment variable
/// 3. URL of the `origin` remote
pub fn resolve_repository<R: Repository + ?Sized>(config: &PublishConfig, repo: &R) -> Result<String> {
    if let Some(repository) = config.repository.as_ref().filter(|r| !r.is_empty()) {
        return Ok(repository.clone());
    }

    if let Some(repository) = std::env::var("GITHUB_REPOSITORY").ok().filter(|r| !r.is_empty()) {
        return Ok(repository);
    }

    repo.remote_url("origin")?
        .as_deref()
        .and_then(repository_from_url)
        .ok_or_else(|| {
            ReleaseError::config("cannot determine the repository to publish to; set publish.repository")
        })
}

/// Extracts "owner/name" from an https or ssh remote URL.
///
/// # Example
/// ```
/// use git_release::publish::repository_from_url;
///
/// assert_eq!(
///     repository_from_url("git@github.com:owner/name.git").as_deref(),
///     Some("owner/name")
/// );
/// ```
pub fn repository_from_url(url: &str) -> Option<String> {
    let path = if let Some((_, rest)) = url.split_once("://") {
        rest.split_once('/')?.1
    } else {
        url.split_once(':')?.1
    };

    let path = path.trim_end_matches('/').trim_end_matches(".git");
    let mut parts = path.rsplitn(2, '/');
    let name = parts.next().filter(|s| !s.is_empty())?;
    let owner = parts.next()?.rsplit('/').next().filter(|s| !s.is_empty())?;

    Some(format!("{}/{}", owner, name))
}
