//! Test-only fakes: a recording working copy, a scripted platform, and a
//! deterministic run context.

use std::cell::{Cell, RefCell};
use std::path::Path;

use anyhow::{Result, anyhow};
use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

use crate::core::errors::ApiError;
use crate::core::gate::Probability;
use crate::core::types::{Committer, Repository, ReviewEvent, ReviewMode, RunContext};
use crate::io::config::NoiseConfig;
use crate::io::git::Vcs;
use crate::io::github::{FileWrite, Issue, MergeOutcome, Platform, PullRequest};

/// Number assigned to every issue created through [`FakePlatform`].
pub const FAKE_ISSUE_NUMBER: u64 = 101;
/// Number assigned to every pull request created through [`FakePlatform`].
pub const FAKE_PULL_NUMBER: u64 = 202;

/// Start instant shared by fixtures (`2026-03-14T09:26:53Z`).
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53)
        .single()
        .expect("valid instant")
}

/// Context for `octo/hello` on `main` with the given gates and approve flag.
pub fn context(issue: Probability, change: Probability, approve: bool) -> RunContext {
    RunContext {
        repo: Repository {
            owner: "octo".to_string(),
            name: "hello".to_string(),
        },
        default_branch: "main".to_string(),
        committer: Committer {
            name: "noise-bot".to_string(),
            email: "noise-bot@example.test".to_string(),
        },
        issue_probability: issue,
        change_probability: change,
        review_mode: if approve {
            ReviewMode::Approve
        } else {
            ReviewMode::Comment
        },
        reviewers: Vec::new(),
        layout: NoiseConfig::default().layout(),
        started_at: fixed_now(),
    }
}

pub fn status_error(method: &str, path: &str, status: u16, body: &str) -> ApiError {
    ApiError::Status {
        method: method.to_string(),
        path: path.to_string(),
        status,
        body: body.to_string(),
    }
}

/// The 422 GitHub returns when the author tries to approve their own change.
pub fn self_approval_error() -> ApiError {
    status_error(
        "POST",
        "/repos/octo/hello/pulls/202/reviews",
        422,
        r#"{"message":"Unprocessable Entity","errors":["Review Can not approve your own pull request"]}"#,
    )
}

/// Working copy fake backed by a temp directory.
///
/// Records one line per call; [`FakeVcs::fail_on`] makes every later call of
/// that operation fail.
pub struct FakeVcs {
    dir: TempDir,
    remote_default: Option<String>,
    calls: RefCell<Vec<String>>,
    failing: RefCell<Vec<String>>,
}

impl FakeVcs {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tempdir"),
            remote_default: None,
            calls: RefCell::new(Vec::new()),
            failing: RefCell::new(Vec::new()),
        }
    }

    pub fn with_remote_default(mut self, branch: &str) -> Self {
        self.remote_default = Some(branch.to_string());
        self
    }

    /// Operation keys: `config-identity`, `symbolic-ref`, `checkout`,
    /// `checkout-new`, `add`, `commit`, `push`, `push-upstream`.
    pub fn fail_on(&self, op: &str) {
        self.failing.borrow_mut().push(op.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn record(&self, op: &str, call: String) -> Result<()> {
        self.calls.borrow_mut().push(call.clone());
        if self.failing.borrow().iter().any(|failing| failing == op) {
            return Err(anyhow!("git {call} failed: scripted failure"));
        }
        Ok(())
    }
}

impl Default for FakeVcs {
    fn default() -> Self {
        Self::new()
    }
}

impl Vcs for FakeVcs {
    fn workdir(&self) -> &Path {
        self.dir.path()
    }

    fn configure_identity(&self, _committer: &Committer) -> Result<()> {
        self.record("config-identity", "config-identity".to_string())
    }

    fn remote_default_branch(&self, remote: &str) -> Result<String> {
        self.record("symbolic-ref", format!("symbolic-ref {remote}"))?;
        self.remote_default
            .clone()
            .ok_or_else(|| anyhow!("ref refs/remotes/{remote}/HEAD is not a symbolic ref"))
    }

    fn checkout(&self, branch: &str) -> Result<()> {
        self.record("checkout", format!("checkout {branch}"))
    }

    fn checkout_new_branch(&self, branch: &str, start_point: &str) -> Result<()> {
        self.record("checkout-new", format!("checkout -b {branch} {start_point}"))
    }

    fn add(&self, path: &str) -> Result<()> {
        self.record("add", format!("add {path}"))
    }

    fn commit(&self, _message: &str) -> Result<()> {
        self.record("commit", "commit".to_string())
    }

    fn push(&self, remote: &str, branch: &str) -> Result<()> {
        self.record("push", format!("push {remote} {branch}"))
    }

    fn push_upstream(&self, remote: &str, branch: &str) -> Result<()> {
        self.record("push-upstream", format!("push -u {remote} {branch}"))
    }
}

/// File written through [`FakePlatform::put_file`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedFile {
    pub path: String,
    pub branch: String,
    pub content: String,
    pub message: String,
    pub identity: Committer,
}

/// Platform fake that records calls and replays scripted failures.
///
/// [`FakePlatform::fail_next`] queues an error for the next call of one
/// operation (keyed by trait method name); later calls succeed again.
pub struct FakePlatform {
    calls: RefCell<Vec<String>>,
    failures: RefCell<Vec<(String, ApiError)>>,
    files: RefCell<Vec<RecordedFile>>,
    unmerged: Cell<bool>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            failures: RefCell::new(Vec::new()),
            files: RefCell::new(Vec::new()),
            unmerged: Cell::new(false),
        }
    }

    pub fn fail_next(&self, op: &str, err: ApiError) {
        self.failures.borrow_mut().push((op.to_string(), err));
    }

    /// Make merges answer `200 {"merged": false}`.
    pub fn report_unmerged(&self) {
        self.unmerged.set(true);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn files(&self) -> Vec<RecordedFile> {
        self.files.borrow().clone()
    }

    fn record(&self, op: &str, call: String) -> Result<(), ApiError> {
        self.calls.borrow_mut().push(call);
        let mut failures = self.failures.borrow_mut();
        match failures.iter().position(|(failing, _)| failing == op) {
            Some(index) => Err(failures.remove(index).1),
            None => Ok(()),
        }
    }
}

impl Default for FakePlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for FakePlatform {
    fn create_issue(&self, _title: &str, _body: &str) -> Result<Issue, ApiError> {
        self.record("create_issue", "create_issue".to_string())?;
        Ok(Issue {
            number: FAKE_ISSUE_NUMBER,
            state: Some("open".to_string()),
            html_url: None,
        })
    }

    fn close_issue(&self, number: u64) -> Result<Issue, ApiError> {
        self.record("close_issue", format!("close_issue #{number}"))?;
        Ok(Issue {
            number,
            state: Some("closed".to_string()),
            html_url: None,
        })
    }

    fn branch_tip(&self, branch: &str) -> Result<String, ApiError> {
        self.record("branch_tip", format!("branch_tip {branch}"))?;
        Ok("0123456789abcdef0123456789abcdef01234567".to_string())
    }

    fn create_branch(&self, branch: &str, _sha: &str) -> Result<(), ApiError> {
        self.record("create_branch", format!("create_branch {branch}"))
    }

    fn put_file(&self, write: &FileWrite<'_>) -> Result<(), ApiError> {
        self.record("put_file", format!("put_file {}@{}", write.path, write.branch))?;
        self.files.borrow_mut().push(RecordedFile {
            path: write.path.to_string(),
            branch: write.branch.to_string(),
            content: write.content.to_string(),
            message: write.message.to_string(),
            identity: write.identity.clone(),
        });
        Ok(())
    }

    fn create_pull_request(
        &self,
        _title: &str,
        _body: &str,
        head: &str,
        base: &str,
    ) -> Result<PullRequest, ApiError> {
        self.record("create_pull_request", format!("create_pull_request {head}->{base}"))?;
        Ok(PullRequest {
            number: FAKE_PULL_NUMBER,
            html_url: None,
        })
    }

    fn request_reviewers(&self, number: u64, reviewers: &[String]) -> Result<(), ApiError> {
        self.record(
            "request_reviewers",
            format!("request_reviewers #{number} {}", reviewers.join(",")),
        )
    }

    fn create_review(&self, number: u64, event: ReviewEvent, _body: &str) -> Result<(), ApiError> {
        self.record(
            "create_review",
            format!("create_review #{number} {}", event.as_str()),
        )
    }

    fn merge_pull_request(&self, number: u64) -> Result<MergeOutcome, ApiError> {
        self.record("merge_pull_request", format!("merge_pull_request #{number}"))?;
        Ok(MergeOutcome {
            merged: !self.unmerged.get(),
            sha: Some("fedcba9876543210fedcba9876543210fedcba98".to_string()),
        })
    }

    fn delete_branch(&self, branch: &str) -> Result<(), ApiError> {
        self.record("delete_branch", format!("delete_branch {branch}"))
    }
}
