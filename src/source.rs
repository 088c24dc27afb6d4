//! Source host access.
//!
//! [`SourceHost`] is the seam between the walker and the version-control
//! host; [`GitHubClient`] implements it against the GitHub REST API.

use crate::error::{Error, Result};
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw";
const API_VERSION: &str = "2022-11-28";

/// Repository identifier of the form `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryId {
    owner: String,
    name: String,
}

impl RepositoryId {
    /// Repository owner (user or organization).
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Repository name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl FromStr for RepositoryId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidRepository {
            value: s.to_string(),
        };

        let (owner, name) = s.split_once('/').ok_or_else(invalid)?;
        let well_formed = |part: &str| {
            !part.is_empty() && !part.contains('/') && !part.chars().any(char::is_whitespace)
        };

        if !well_formed(owner) || !well_formed(name) {
            return Err(invalid());
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Repository metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryInfo {
    /// `owner/name` as reported by the host
    pub full_name: String,
    /// Default branch
    pub default_branch: String,
}

/// Kind of a node in a repository tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory
    Dir,
    /// Symbolic link
    Symlink,
    /// Git submodule
    Submodule,
    /// Anything the host adds later
    #[serde(other)]
    Other,
}

/// One entry of a directory listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentEntry {
    /// Node kind
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Path from the repository root
    pub path: String,
}

impl ContentEntry {
    /// Returns true if this entry has children to expand.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }
}

/// Read access to one repository on a version-control host.
pub trait SourceHost {
    /// Looks up repository metadata. Fails if the repository is unreachable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] for rejected credentials, or a transport/API error.
    fn repository(&self) -> Result<RepositoryInfo>;

    /// Lists the direct children of a directory (`""` is the root).
    ///
    /// # Errors
    ///
    /// Returns an error if the listing cannot be retrieved.
    fn list_directory(&self, path: &str) -> Result<Vec<ContentEntry>>;

    /// Fetches the raw bytes of a file. Decoding is left to the caller.
    ///
    /// # Errors
    ///
    /// Returns an error if the content cannot be retrieved.
    fn fetch_blob(&self, path: &str) -> Result<Vec<u8>>;

    /// Returns the head branch name of a pull request.
    ///
    /// # Errors
    ///
    /// Returns an error if the pull request cannot be found.
    fn pull_request_head(&self, number: u64) -> Result<String>;
}

#[derive(Deserialize)]
struct PullRequest {
    head: PullRequestHead,
}

#[derive(Deserialize)]
struct PullRequestHead {
    #[serde(rename = "ref")]
    branch: String,
}

/// Blocking GitHub REST API client scoped to a single repository.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Client,
    base_url: Url,
    repository: RepositoryId,
}

impl GitHubClient {
    /// Creates a client for `repository` authenticated with `token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid, the token is not a valid
    /// header value, or the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        repository: RepositoryId,
        token: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::config(format!("Invalid GitHub API URL '{base_url}': {e}")))?;

        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| Error::config("Access token contains invalid characters"))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("repodoc/", env!("CARGO_PKG_VERSION"))),
        );
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url,
            repository,
        })
    }

    /// Repository this client reads from.
    #[must_use]
    pub const fn repository_id(&self) -> &RepositoryId {
        &self.repository
    }

    /// Builds `{base}/repos/{owner}/{name}/{segments...}`.
    fn repo_url<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::config(format!("Cannot use '{}' as a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(["repos", self.repository.owner(), self.repository.name()])
            .extend(segments);
        Ok(url)
    }

    fn contents_url(&self, path: &str) -> Result<Url> {
        let mut url = self.repo_url(
            std::iter::once("contents").chain(path.split('/').filter(|s| !s.is_empty())),
        )?;
        if path.is_empty() {
            if let Ok(mut segments) = url.path_segments_mut() {
                segments.push("");
            }
        }
        Ok(url)
    }

    fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let request = self.client.get(url).header(ACCEPT, JSON_MEDIA_TYPE);
        let body = Self::execute(request)?.text()?;
        serde_json::from_str(&body).map_err(Error::from)
    }

    /// Sends the request and maps non-success statuses to typed errors.
    fn execute(request: RequestBuilder) -> Result<Response> {
        let response = request.send()?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().unwrap_or_default();
        debug!("GitHub API error: {} - {}", status, message);

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(Error::Auth {
                message: format!("GitHub rejected the request ({status}): {message}"),
            }),
            _ => Err(Error::Api {
                status: status.as_u16(),
                message,
            }),
        }
    }
}

impl SourceHost for GitHubClient {
    #[instrument(skip(self), fields(repository = %self.repository), level = "debug")]
    fn repository(&self) -> Result<RepositoryInfo> {
        self.get_json(self.repo_url([])?)
    }

    #[instrument(skip(self), level = "debug")]
    fn list_directory(&self, path: &str) -> Result<Vec<ContentEntry>> {
        self.get_json(self.contents_url(path)?)
    }

    #[instrument(skip(self), level = "debug")]
    fn fetch_blob(&self, path: &str) -> Result<Vec<u8>> {
        let request = self
            .client
            .get(self.contents_url(path)?)
            .header(ACCEPT, RAW_MEDIA_TYPE);
        let bytes = Self::execute(request)?.bytes()?;
        Ok(bytes.to_vec())
    }

    #[instrument(skip(self), level = "debug")]
    fn pull_request_head(&self, number: u64) -> Result<String> {
        let number = number.to_string();
        let pull: PullRequest = self.get_json(self.repo_url(["pulls", number.as_str()])?)?;
        Ok(pull.head.branch)
    }
}
