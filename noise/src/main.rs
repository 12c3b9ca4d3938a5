//! Scheduled synthetic repository activity.
//!
//! Meant to be triggered by an external scheduler (e.g. a cron workflow) from
//! inside a checkout of the target repository. Each invocation performs one
//! run and exits.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::error;

use noise::exit_codes;
use noise::io::config::{DEFAULT_CONFIG_PATH, load_config};
use noise::io::git::Git;
use noise::io::github::GithubClient;
use noise::io::settings::Settings;
use noise::logging;
use noise::resolve::{build_context, require_credentials};
use noise::run::run_pipeline;

#[derive(Parser)]
#[command(
    name = "noise",
    version,
    about = "Generate synthetic commit, issue and pull-request activity on a GitHub repository"
)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    /// Working copy of the target repository.
    #[arg(long, default_value = ".")]
    workdir: PathBuf,

    /// Seed the random source (reproducible file picks and texts).
    #[arg(long)]
    seed: Option<u64>,
}

fn main() {
    logging::init();
    if let Err(err) = run() {
        error!(error = %format!("{err:#}"), "run failed");
        std::process::exit(exit_codes::FAILURE);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let credentials = require_credentials(&cli.settings)?;

    let config_path = cli.workdir.join(
        cli.settings
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH)),
    );
    let config = load_config(&config_path)?;

    let git = Git::new(cli.workdir.clone());
    let ctx = build_context(
        &cli.settings,
        credentials.repo.clone(),
        &config,
        &git,
        Utc::now(),
    );
    let client = GithubClient::new(
        &credentials.api_base,
        &credentials.token,
        credentials.repo,
        &config.user_agent,
        Duration::from_secs(config.request_timeout_secs),
    )
    .context("build github client")?;

    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let report = run_pipeline(&ctx, &git, &client, &mut rng)?;
    report.emit();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_flags() {
        let cli = Cli::parse_from([
            "noise",
            "--token",
            "t",
            "--repository",
            "octo/hello",
            "--issue-probability",
            "-5",
            "--approve",
            "yes",
            "--seed",
            "42",
        ]);
        assert_eq!(cli.settings.token.as_deref(), Some("t"));
        assert_eq!(cli.settings.repository.as_deref(), Some("octo/hello"));
        assert_eq!(cli.settings.issue_probability.as_deref(), Some("-5"));
        assert_eq!(cli.settings.approve.as_deref(), Some("yes"));
        assert_eq!(cli.seed, Some(42));
        assert_eq!(cli.workdir, PathBuf::from("."));
    }
}
