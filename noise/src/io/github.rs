//! GitHub REST adapter.
//!
//! [`Platform`] is the seam the stages depend on; [`GithubClient`] implements
//! it with a blocking `reqwest` client. Every call is single-shot: a non-2xx
//! answer becomes [`ApiError::Status`] carrying method, path, status and body,
//! and callers decide whether that is fatal.

use std::time::Duration;

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Method;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, instrument};

use crate::core::errors::ApiError;
use crate::core::types::{Committer, Repository, ReviewEvent};

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
const API_VERSION: &str = "2022-11-28";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Issue {
    pub number: u64,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    #[serde(default)]
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MergeOutcome {
    #[serde(default)]
    pub merged: bool,
    #[serde(default)]
    pub sha: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitRef {
    object: GitObject,
}

#[derive(Debug, Deserialize)]
struct GitObject {
    sha: String,
}

/// A single file written to a branch through the contents endpoint.
#[derive(Debug, Clone)]
pub struct FileWrite<'a> {
    pub path: &'a str,
    /// Raw file contents; encoded to base64 on the wire.
    pub content: &'a str,
    pub message: &'a str,
    pub branch: &'a str,
    /// Stamped as both committer and author.
    pub identity: &'a Committer,
}

/// Hosted-platform operations needed by a run.
pub trait Platform {
    fn create_issue(&self, title: &str, body: &str) -> Result<Issue, ApiError>;
    fn close_issue(&self, number: u64) -> Result<Issue, ApiError>;
    /// Commit SHA at the tip of `branch`.
    fn branch_tip(&self, branch: &str) -> Result<String, ApiError>;
    fn create_branch(&self, branch: &str, sha: &str) -> Result<(), ApiError>;
    fn put_file(&self, write: &FileWrite<'_>) -> Result<(), ApiError>;
    fn create_pull_request(
        &self,
        title: &str,
        body: &str,
        head: &str,
        base: &str,
    ) -> Result<PullRequest, ApiError>;
    fn request_reviewers(&self, number: u64, reviewers: &[String]) -> Result<(), ApiError>;
    fn create_review(&self, number: u64, event: ReviewEvent, body: &str) -> Result<(), ApiError>;
    /// Standard merge (`merge_method=merge`).
    fn merge_pull_request(&self, number: u64) -> Result<MergeOutcome, ApiError>;
    fn delete_branch(&self, branch: &str) -> Result<(), ApiError>;
}

/// Blocking GitHub REST client scoped to one repository.
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: Client,
    api_base: String,
    repo: Repository,
}

impl GithubClient {
    pub fn new(
        api_base: &str,
        token: &str,
        repo: Repository,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent).context("invalid user agent header")?,
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
            .context("invalid github authorization header")?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context("failed to create github api client")?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            repo,
        })
    }

    fn repo_path(&self, suffix: &str) -> String {
        format!("/repos/{}/{}{suffix}", self.repo.owner, self.repo.name)
    }

    /// Send one request; 204 and empty bodies decode to `Value::Null`.
    fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value, ApiError> {
        let url = format!("{}{path}", self.api_base);
        let mut request = self.http.request(method.clone(), &url);
        if let Some(body) = body {
            request = request.json(body);
        }
        debug!(%method, path, "github request");

        let transport = |err: reqwest::Error| ApiError::Transport {
            method: method.to_string(),
            path: path.to_string(),
            message: err.to_string(),
        };
        let response = request.send().map_err(transport)?;
        let status = response.status();
        let text = response.text().map_err(transport)?;
        debug!(%method, path, status = status.as_u16(), "github response");

        if !status.is_success() {
            return Err(ApiError::Status {
                method: method.to_string(),
                path: path.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }
        if status == StatusCode::NO_CONTENT || text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|err| ApiError::Decode {
            method: method.to_string(),
            path: path.to_string(),
            message: err.to_string(),
        })
    }

    fn send_as<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<T, ApiError> {
        let value = self.send(method.clone(), path, body)?;
        serde_json::from_value(value).map_err(|err| ApiError::Decode {
            method: method.to_string(),
            path: path.to_string(),
            message: err.to_string(),
        })
    }
}

/// Percent-encode each `/`-separated segment, keeping the separators.
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

impl Platform for GithubClient {
    #[instrument(skip_all)]
    fn create_issue(&self, title: &str, body: &str) -> Result<Issue, ApiError> {
        let payload = json!({ "title": title, "body": body });
        self.send_as(Method::POST, &self.repo_path("/issues"), Some(&payload))
    }

    #[instrument(skip_all, fields(number))]
    fn close_issue(&self, number: u64) -> Result<Issue, ApiError> {
        let payload = json!({ "state": "closed" });
        self.send_as(
            Method::PATCH,
            &self.repo_path(&format!("/issues/{number}")),
            Some(&payload),
        )
    }

    #[instrument(skip_all, fields(branch))]
    fn branch_tip(&self, branch: &str) -> Result<String, ApiError> {
        let found: GitRef = self.send_as(
            Method::GET,
            &self.repo_path(&format!("/git/ref/heads/{}", encode_path(branch))),
            None,
        )?;
        Ok(found.object.sha)
    }

    #[instrument(skip_all, fields(branch))]
    fn create_branch(&self, branch: &str, sha: &str) -> Result<(), ApiError> {
        let payload = json!({ "ref": format!("refs/heads/{branch}"), "sha": sha });
        self.send(Method::POST, &self.repo_path("/git/refs"), Some(&payload))?;
        Ok(())
    }

    #[instrument(skip_all, fields(path = write.path, branch = write.branch))]
    fn put_file(&self, write: &FileWrite<'_>) -> Result<(), ApiError> {
        let identity = json!({ "name": write.identity.name, "email": write.identity.email });
        let payload = json!({
            "message": write.message,
            "content": BASE64.encode(write.content.as_bytes()),
            "branch": write.branch,
            "committer": identity,
            "author": identity,
        });
        self.send(
            Method::PUT,
            &self.repo_path(&format!("/contents/{}", encode_path(write.path))),
            Some(&payload),
        )?;
        Ok(())
    }

    #[instrument(skip_all, fields(head, base))]
    fn create_pull_request(
        &self,
        title: &str,
        body: &str,
        head: &str,
        base: &str,
    ) -> Result<PullRequest, ApiError> {
        let payload = json!({ "title": title, "body": body, "head": head, "base": base });
        self.send_as(Method::POST, &self.repo_path("/pulls"), Some(&payload))
    }

    #[instrument(skip_all, fields(number))]
    fn request_reviewers(&self, number: u64, reviewers: &[String]) -> Result<(), ApiError> {
        let payload = json!({ "reviewers": reviewers });
        self.send(
            Method::POST,
            &self.repo_path(&format!("/pulls/{number}/requested_reviewers")),
            Some(&payload),
        )?;
        Ok(())
    }

    #[instrument(skip_all, fields(number, event = event.as_str()))]
    fn create_review(&self, number: u64, event: ReviewEvent, body: &str) -> Result<(), ApiError> {
        let payload = json!({ "event": event, "body": body });
        self.send(
            Method::POST,
            &self.repo_path(&format!("/pulls/{number}/reviews")),
            Some(&payload),
        )?;
        Ok(())
    }

    #[instrument(skip_all, fields(number))]
    fn merge_pull_request(&self, number: u64) -> Result<MergeOutcome, ApiError> {
        let payload = json!({ "merge_method": "merge" });
        self.send_as(
            Method::PUT,
            &self.repo_path(&format!("/pulls/{number}/merge")),
            Some(&payload),
        )
    }

    #[instrument(skip_all, fields(branch))]
    fn delete_branch(&self, branch: &str) -> Result<(), ApiError> {
        self.send(
            Method::DELETE,
            &self.repo_path(&format!("/git/refs/heads/{}", encode_path(branch))),
            None,
        )?;
        Ok(())
    }
}
