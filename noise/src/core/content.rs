//! Generated content: file picks, payload lines, titles and names.
//!
//! Every function is a pure function of an injected random source and the
//! run's start instant.

use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use rand::seq::SliceRandom;

use crate::core::types::ReviewEvent;

pub const COMMIT_TEMPLATES: &[&str] = &[
    "chore(noise): heartbeat",
    "chore: refresh activity record",
    "docs: append activity note",
    "chore(activity): routine update",
];

pub const ISSUE_TITLES: &[&str] = &[
    "Noisy issue",
    "Routine check-in",
    "Activity ping",
    "Housekeeping note",
];

pub const ISSUE_BODY: &str = "Auto-generated and auto-closed to keep repository activity flowing.";

pub const PULL_REQUEST_TITLES: &[&str] = &["Merge", "Integrate", "Sync activity from"];

pub const PULL_REQUEST_BODIES: &[&str] = &[
    "Automated pull request for routine activity.",
    "Routine sync opened by the activity bot.",
    "Small generated change; safe to merge.",
];

const TOKEN_LEN: usize = 6;
const MAX_PAYLOAD_LINES: usize = 3;

/// Local mutation for the default-branch commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingChange {
    /// Path relative to the working-copy root.
    pub path: String,
    /// Lines to append (without trailing newlines).
    pub lines: Vec<String>,
    pub message: String,
}

impl WorkingChange {
    /// Payload as appended to the file, one line each, newline-terminated.
    pub fn payload(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueDraft {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestDraft {
    pub title: String,
    pub body: String,
}

/// Millisecond-precision UTC timestamp used in every generated text.
pub fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn pick<R: Rng + ?Sized>(rng: &mut R, pool: &[&'static str]) -> &'static str {
    pool.choose(rng).copied().unwrap_or_default()
}

fn random_token<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    std::iter::repeat_with(|| rng.sample(Alphanumeric))
        .map(char::from)
        .take(len)
        .collect()
}

/// One payload line: `<timestamp> <letter> <token>`.
pub fn activity_line<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> String {
    let letter = char::from(rng.gen_range(b'a'..=b'z'));
    let token = random_token(rng, TOKEN_LEN);
    format!("{} {letter} {token}", timestamp(now))
}

/// Plan the default-branch commit.
///
/// Returns `None` only when `candidates` is empty.
pub fn plan_working_change<R: Rng + ?Sized>(
    rng: &mut R,
    now: DateTime<Utc>,
    candidates: &[String],
) -> Option<WorkingChange> {
    let path = candidates.choose(rng)?.clone();
    let template = pick(rng, COMMIT_TEMPLATES);
    let count = rng.gen_range(1..=MAX_PAYLOAD_LINES);
    let lines = (0..count).map(|_| activity_line(rng, now)).collect();
    Some(WorkingChange {
        path,
        lines,
        message: format!("{template} {}", timestamp(now)),
    })
}

pub fn issue_draft<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> IssueDraft {
    IssueDraft {
        title: format!("{} {}", pick(rng, ISSUE_TITLES), timestamp(now)),
        body: ISSUE_BODY.to_string(),
    }
}

pub fn pull_request_draft<R: Rng + ?Sized>(rng: &mut R, branch: &str) -> PullRequestDraft {
    PullRequestDraft {
        title: format!("{} {branch}", pick(rng, PULL_REQUEST_TITLES)),
        body: pick(rng, PULL_REQUEST_BODIES).to_string(),
    }
}

/// Branch name derived from the run's start time in milliseconds.
///
/// Strictly increasing across runs as long as the clock is.
pub fn branch_name(prefix: &str, now: DateTime<Utc>) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), now.timestamp_millis())
}

/// Path of the file that seeds a generated branch.
pub fn seed_file_path(seed_dir: &str, branch: &str) -> String {
    format!("{}/{branch}.txt", seed_dir.trim_end_matches('/'))
}

pub fn seed_content(now: DateTime<Utc>) -> String {
    format!("hello {}\n", timestamp(now))
}

pub fn seed_commit_message(path: &str) -> String {
    format!("feat: add {path}")
}

pub fn review_body(event: ReviewEvent) -> &'static str {
    match event {
        ReviewEvent::Approve => "Looks good, approving the routine change.",
        ReviewEvent::Comment => "Automated review: routine change, no concerns.",
    }
}
