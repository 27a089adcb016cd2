//! GitHub REST API snapshot provider
//!
//! Commit metadata comes from `GET {api}/repos/{owner}/{name}/commits/{sha}`
//! and tree snapshots from `GET {api}/repos/{owner}/{name}/tarball/{sha}`,
//! which redirects to a gzip tarball wrapped in a single top directory.

use std::time::Duration;

use log::{debug, warn};
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use url::Url;

use crate::defaults;
use crate::error::{Error, Result};
use crate::model::CommitInfo;
use crate::provider::SnapshotProvider;

const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";
const API_VERSION_HEADER: &str = "x-github-api-version";
const API_VERSION: &str = "2022-11-28";
const RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
const RATELIMIT_RESET: &str = "x-ratelimit-reset";

#[derive(Debug, Deserialize)]
struct CommitResponse {
    sha: String,
    #[serde(default)]
    parents: Vec<ParentRef>,
}

#[derive(Debug, Deserialize)]
struct ParentRef {
    sha: String,
}

/// Snapshot provider backed by the GitHub REST API.
#[derive(Debug, Clone)]
pub struct GitHubProvider {
    client: Client,
    api_base: Url,
}

impl GitHubProvider {
    /// Create a provider for `api_url` (e.g. `https://api.github.com`, or a
    /// GitHub Enterprise `https://host/api/v3`) authenticating with `token`.
    pub fn new(token: &str, api_url: &str, timeout: Duration) -> Result<Self> {
        let api_base = Url::parse(api_url)?;
        if api_base.cannot_be_a_base() {
            return Err(Error::Transport {
                url: api_url.to_string(),
                message: "API URL cannot be used as a base URL".to_string(),
            });
        }

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
            Error::Transport {
                url: api_url.to_string(),
                message: "token contains characters not allowed in a header".to_string(),
            }
        })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_MEDIA_TYPE));
        headers.insert(API_VERSION_HEADER, HeaderValue::from_static(API_VERSION));

        let client = Client::builder()
            .user_agent(defaults::user_agent())
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Transport {
                url: api_url.to_string(),
                message: format!("cannot create HTTP client: {}", e),
            })?;

        Ok(Self { client, api_base })
    }

    /// Provider for the public GitHub API with the default timeout.
    pub fn with_token(token: &str) -> Result<Self> {
        Self::new(token, defaults::GITHUB_API_URL, defaults::REQUEST_TIMEOUT)
    }

    /// `{api}/repos/{owner}/{name}/{kind}/{commit}`, keeping any path prefix
    /// of the API base.
    fn endpoint(&self, repo: &str, kind: &str, commit: &str) -> Result<Url> {
        let mut url = self.api_base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| Error::Transport {
                url: self.api_base.to_string(),
                message: "API URL cannot be used as a base URL".to_string(),
            })?;
            segments.pop_if_empty().push("repos");
            for part in repo.split('/') {
                segments.push(part);
            }
            segments.push(kind).push(commit);
        }
        Ok(url)
    }

    fn get(&self, url: &Url, repo: &str, commit: &str) -> Result<Response> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| transport(url, &e))?;

        let headers = response.headers();
        let remaining = header_str(headers, RATELIMIT_REMAINING);
        let reset = header_str(headers, RATELIMIT_RESET);
        classify_status(
            url.as_str(),
            repo,
            commit,
            response.status().as_u16(),
            remaining,
            reset,
        )?;
        Ok(response)
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn transport(url: &Url, error: &reqwest::Error) -> Error {
    let message = if error.is_timeout() {
        format!("request timed out: {}", error)
    } else {
        error.to_string()
    };
    Error::Transport {
        url: url.to_string(),
        message,
    }
}

/// Map an HTTP status (and rate-limit headers) onto the provider failure
/// classes. Success statuses map to `Ok(())`.
pub fn classify_status(
    url: &str,
    repo: &str,
    commit: &str,
    status: u16,
    ratelimit_remaining: Option<&str>,
    ratelimit_reset: Option<&str>,
) -> Result<()> {
    let reset = ratelimit_reset.and_then(|r| r.trim().parse::<u64>().ok());
    let exhausted = ratelimit_remaining.map(str::trim) == Some("0");
    match status {
        200..=299 => Ok(()),
        404 | 422 => Err(Error::NotFound {
            repo: repo.to_string(),
            commit: commit.to_string(),
        }),
        429 => Err(Error::RateLimited {
            url: url.to_string(),
            reset,
        }),
        403 if exhausted => Err(Error::RateLimited {
            url: url.to_string(),
            reset,
        }),
        _ => Err(Error::Transport {
            url: url.to_string(),
            message: format!("unexpected HTTP status {}", status),
        }),
    }
}

/// Decode a commit response body into [`CommitInfo`].
fn parse_commit(repo: &str, body: &[u8], url: &str) -> Result<CommitInfo> {
    let parsed: CommitResponse = serde_json::from_slice(body).map_err(|e| Error::Transport {
        url: url.to_string(),
        message: format!("unexpected commit response: {}", e),
    })?;
    Ok(CommitInfo {
        repo: repo.to_string(),
        commit: parsed.sha,
        parents: parsed.parents.into_iter().map(|p| p.sha).collect(),
    })
}

impl SnapshotProvider for GitHubProvider {
    fn commit_info(&self, repo: &str, commit: &str) -> Result<CommitInfo> {
        let url = self.endpoint(repo, "commits", commit)?;
        let response = self.get(&url, repo, commit)?;
        let body = response.bytes().map_err(|e| transport(&url, &e))?;
        let info = parse_commit(repo, &body, url.as_str())?;
        if info.parents.len() != 1 {
            warn!(
                "{}@{} has {} parents",
                repo,
                commit,
                info.parents.len()
            );
        }
        Ok(info)
    }

    fn fetch_archive(&self, repo: &str, commit: &str) -> Result<Vec<u8>> {
        let url = self.endpoint(repo, "tarball", commit)?;
        let response = self.get(&url, repo, commit)?;
        let bytes = response.bytes().map_err(|e| transport(&url, &e))?;
        debug!("Fetched {} bytes for {}@{}", bytes.len(), repo, commit);
        Ok(bytes.to_vec())
    }
}
