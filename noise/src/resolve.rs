//! Environment Resolver: settings + config file + probes → [`RunContext`].
//!
//! Mandatory values are checked by [`require_credentials`] before anything
//! touches the working copy or the network, so a misconfigured run fails with
//! no external effects.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::core::errors::ConfigError;
use crate::core::gate::Probability;
use crate::core::types::{Committer, Repository, ReviewMode, RunContext};
use crate::io::config::NoiseConfig;
use crate::io::git::Vcs;
use crate::io::github::DEFAULT_API_BASE;
use crate::io::settings::{Settings, non_blank, parse_flag, parse_reviewers};

/// Used when neither an override nor the remote's `HEAD` names a branch.
pub const FALLBACK_DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_COMMITTER_NAME: &str = "github-actions[bot]";
pub const DEFAULT_COMMITTER_EMAIL: &str = "github-actions[bot]@users.noreply.github.com";

/// Everything needed to talk to the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub api_base: String,
    pub repo: Repository,
}

/// Validate the mandatory settings (token and `owner/name`).
pub fn require_credentials(settings: &Settings) -> Result<Credentials, ConfigError> {
    let token = non_blank(settings.token.as_deref()).ok_or(ConfigError::MissingToken)?;
    let raw_repo =
        non_blank(settings.repository.as_deref()).ok_or(ConfigError::MissingRepository)?;
    let repo = Repository::parse(raw_repo)?;
    let api_base = non_blank(settings.api_url.as_deref())
        .unwrap_or(DEFAULT_API_BASE)
        .to_string();
    Ok(Credentials {
        token: token.to_string(),
        api_base,
        repo,
    })
}

/// Override → remote symbolic `HEAD` → [`FALLBACK_DEFAULT_BRANCH`].
///
/// Probe failures are never fatal; they fall through to the next option.
pub fn resolve_default_branch<V: Vcs>(explicit: Option<&str>, vcs: &V, remote: &str) -> String {
    if let Some(branch) = non_blank(explicit) {
        debug!(branch, "default branch from override");
        return branch.to_string();
    }
    match vcs.remote_default_branch(remote) {
        Ok(branch) => branch,
        Err(err) => {
            debug!(error = %format!("{err:#}"), "default branch probe failed, using fallback");
            FALLBACK_DEFAULT_BRANCH.to_string()
        }
    }
}

fn probability(raw: Option<&str>) -> Probability {
    match non_blank(raw) {
        Some(value) => Probability::parse(value),
        None => Probability::ALWAYS,
    }
}

/// Assemble the immutable context for this run.
pub fn build_context<V: Vcs>(
    settings: &Settings,
    repo: Repository,
    config: &NoiseConfig,
    vcs: &V,
    started_at: DateTime<Utc>,
) -> RunContext {
    let default_branch =
        resolve_default_branch(settings.default_branch.as_deref(), vcs, &config.remote);
    let committer = Committer {
        name: non_blank(settings.git_user_name.as_deref())
            .unwrap_or(DEFAULT_COMMITTER_NAME)
            .to_string(),
        email: non_blank(settings.git_user_email.as_deref())
            .unwrap_or(DEFAULT_COMMITTER_EMAIL)
            .to_string(),
    };
    let review_mode = if parse_flag(settings.approve.as_deref()) {
        ReviewMode::Approve
    } else {
        ReviewMode::Comment
    };

    let ctx = RunContext {
        repo,
        default_branch,
        committer,
        issue_probability: probability(settings.issue_probability.as_deref()),
        change_probability: probability(settings.pr_probability.as_deref()),
        review_mode,
        reviewers: parse_reviewers(settings.reviewers.as_deref()),
        layout: config.layout(),
        started_at,
    };
    info!(
        repo = %ctx.repo.slug(),
        default_branch = %ctx.default_branch,
        issue_probability = ctx.issue_probability.percent(),
        pr_probability = ctx.change_probability.percent(),
        review_mode = ?ctx.review_mode,
        "run context resolved"
    );
    ctx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeVcs, fixed_now};

    fn settings() -> Settings {
        Settings {
            token: Some("t0k3n".to_string()),
            repository: Some("octo/hello".to_string()),
            ..Settings::default()
        }
    }

    fn repo() -> Repository {
        Repository::parse("octo/hello").expect("repo")
    }

    #[test]
    fn missing_token_is_a_config_error() {
        let settings = Settings {
            token: Some("   ".to_string()),
            ..settings()
        };
        assert_eq!(
            require_credentials(&settings).unwrap_err(),
            ConfigError::MissingToken
        );
    }

    #[test]
    fn missing_or_malformed_repository_is_a_config_error() {
        let missing = Settings {
            repository: None,
            ..settings()
        };
        assert_eq!(
            require_credentials(&missing).unwrap_err(),
            ConfigError::MissingRepository
        );

        let malformed = Settings {
            repository: Some("hello".to_string()),
            ..settings()
        };
        assert!(matches!(
            require_credentials(&malformed).unwrap_err(),
            ConfigError::InvalidRepository(_)
        ));
    }

    #[test]
    fn credentials_default_the_api_base() {
        let creds = require_credentials(&settings()).expect("credentials");
        assert_eq!(creds.api_base, DEFAULT_API_BASE);
        assert_eq!(creds.repo.slug(), "octo/hello");
        assert_eq!(creds.token, "t0k3n");
    }

    #[test]
    fn override_wins_without_probing() {
        let vcs = FakeVcs::new().with_remote_default("trunk");
        assert_eq!(resolve_default_branch(Some("release"), &vcs, "origin"), "release");
        assert!(vcs.calls().is_empty());
    }

    #[test]
    fn remote_head_is_used_when_no_override() {
        let vcs = FakeVcs::new().with_remote_default("trunk");
        assert_eq!(resolve_default_branch(None, &vcs, "origin"), "trunk");
        assert_eq!(vcs.calls(), vec!["symbolic-ref origin"]);
    }

    #[test]
    fn unreadable_remote_head_falls_back_to_main() {
        let vcs = FakeVcs::new();
        vcs.fail_on("symbolic-ref");
        assert_eq!(resolve_default_branch(Some(" "), &vcs, "origin"), "main");
    }

    #[test]
    fn context_applies_defaults() {
        let vcs = FakeVcs::new();
        let ctx = build_context(&settings(), repo(), &NoiseConfig::default(), &vcs, fixed_now());
        assert_eq!(ctx.default_branch, "main");
        assert_eq!(ctx.committer.name, DEFAULT_COMMITTER_NAME);
        assert_eq!(ctx.committer.email, DEFAULT_COMMITTER_EMAIL);
        assert_eq!(ctx.issue_probability, Probability::ALWAYS);
        assert_eq!(ctx.change_probability, Probability::ALWAYS);
        assert_eq!(ctx.review_mode, ReviewMode::Comment);
        assert!(ctx.reviewers.is_empty());
        assert_eq!(ctx.started_at, fixed_now());
    }

    #[test]
    fn context_interprets_raw_settings() {
        let vcs = FakeVcs::new();
        let settings = Settings {
            default_branch: Some("develop".to_string()),
            git_user_name: Some("Noise Bot".to_string()),
            git_user_email: Some("noise@example.test".to_string()),
            issue_probability: Some("175".to_string()),
            pr_probability: Some("sometimes".to_string()),
            approve: Some("true".to_string()),
            reviewers: Some("alice,bob".to_string()),
            ..settings()
        };
        let ctx = build_context(&settings, repo(), &NoiseConfig::default(), &vcs, fixed_now());
        assert_eq!(ctx.default_branch, "develop");
        assert_eq!(ctx.committer.name, "Noise Bot");
        assert_eq!(ctx.issue_probability, Probability::ALWAYS);
        assert_eq!(ctx.change_probability, Probability::NEVER);
        assert_eq!(ctx.review_mode, ReviewMode::Approve);
        assert_eq!(ctx.reviewers, vec!["alice", "bob"]);
    }
}
