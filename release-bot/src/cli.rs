///
/// This module implements the CLI interface for release-bot: command parsing,
/// argument validation and wiring the GitHub and Slack clients into the
/// run-level operations of [`release_bot_core::pipeline`].
///
/// All parsing, rendering and versioning lives in the `release-bot-core` crate.
/// This module is strictly for CLI glue.
///
/// ## How To Use
/// - For CI jobs: run the installed `release-bot` binary with `--help`.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
use crate::load_config::{load_config, AppEnv};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use release_bot_core::chat::Priority;
use release_bot_core::contract::PullRequestProvider;
use release_bot_core::event::is_direct_push;
use release_bot_core::pipeline::{self, RunOutcome};
use std::fs;
use std::path::PathBuf;

/// CLI for release-bot: summarise, version and announce pull-request driven releases.
#[derive(Parser)]
#[clap(
    name = "release-bot",
    version,
    about = "Summarise merged pull requests, publish versioned releases and notify chat"
)]
pub struct Cli {
    /// Path to the YAML config file; defaults apply when omitted
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open the deploy pull request from the staging branch if none is open
    OpenDeployPr,
    /// Rewrite the deploy pull request body from its contributing pull requests
    Summarize,
    /// Overwrite the release summary section of one pull request
    FillSummary {
        /// Pull request whose description is updated
        #[clap(long)]
        pr: u64,
        /// Pull requests to summarise, comma separated
        #[clap(long, value_delimiter = ',', required = true)]
        prs: Vec<u64>,
    },
    /// Publish the next release for a merge commit
    Release {
        #[clap(long)]
        sha: String,
        /// Announce the release in chat after publishing
        #[clap(long)]
        announce: bool,
    },
    /// Announce an already published release in chat
    Announce {
        #[clap(long)]
        tag: String,
    },
    /// Post a pull request to chat for review
    Notify {
        #[clap(long)]
        pr: u64,
        /// Review priority: high, medium or low
        #[clap(long)]
        priority: Option<String>,
        /// File holding review text to append to the thread; repeatable
        #[clap(long = "review")]
        reviews: Vec<PathBuf>,
    },
    /// Report whether a pushed commit was pushed directly rather than merged
    CheckPush {
        #[clap(long)]
        sha: String,
    },
}

fn read_reviews(paths: &[PathBuf]) -> Result<Vec<String>> {
    paths
        .iter()
        .map(|path| {
            fs::read_to_string(path).with_context(|| format!("Failed to read review file {path:?}"))
        })
        .collect()
}

async fn check_push<P: PullRequestProvider>(provider: &P, sha: &str) -> RunOutcome {
    match is_direct_push(provider, sha).await {
        Ok(true) => RunOutcome::success("Direct push"),
        Ok(false) => RunOutcome::skipped("Commit merges a pull request"),
        Err(e) => e.into(),
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<RunOutcome> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    let config = load_config(cli.config.as_deref())?;
    let app_env = AppEnv::from_env()?;
    let github = app_env.github_client();

    let outcome = match cli.command {
        Commands::OpenDeployPr => {
            tracing::info!(command = "open-deploy-pr", "Ensuring deploy pull request");
            pipeline::open_deploy_pull_request(&github, &config).await
        }
        Commands::Summarize => {
            tracing::info!(command = "summarize", "Summarising deploy pull request");
            pipeline::summarize_deploy_pull_request(&github, &config).await
        }
        Commands::FillSummary { pr, prs } => {
            tracing::info!(command = "fill-summary", pr, count = prs.len(), "Filling release summary");
            pipeline::fill_release_summary(&github, pr, &prs, &config).await
        }
        Commands::Release { sha, announce } => {
            tracing::info!(command = "release", sha = %sha, announce, "Publishing release");
            let slack = if announce {
                Some(app_env.require_slack_client()?)
            } else {
                None
            };
            pipeline::release(&github, slack.as_ref(), &sha, &app_env.repository, &config).await
        }
        Commands::Announce { tag } => {
            tracing::info!(command = "announce", tag = %tag, "Announcing release");
            let slack = app_env.require_slack_client()?;
            match github.get_release(&tag).await {
                Ok(release) => {
                    pipeline::announce_release(&slack, &release, &app_env.repository, &config).await
                }
                Err(e) => release_bot_core::error::ReleaseError::from(e).into(),
            }
        }
        Commands::Notify {
            pr,
            priority,
            reviews,
        } => {
            tracing::info!(command = "notify", pr, ?priority, "Notifying pull request");
            let slack = app_env.require_slack_client()?;
            let external = read_reviews(&reviews)?;
            let priority = priority.as_deref().map(Priority::parse);
            pipeline::notify_pull_request(&github, &slack, pr, priority, external, &config).await
        }
        Commands::CheckPush { sha } => {
            tracing::info!(command = "check-push", sha = %sha, "Checking push commit");
            check_push(&github, &sha).await
        }
    };

    match outcome.status {
        pipeline::RunStatus::Error => {
            tracing::error!(reason = ?outcome.reason, "Run finished with error")
        }
        _ => tracing::info!(status = ?outcome.status, reason = ?outcome.reason, "Run finished"),
    }
    Ok(outcome)
}
