//! gh-label-sync CLI
//!
//! Command line / GitHub Action entry point for reconciling repository labels

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use tracing::error;
use tracing_subscriber::EnvFilter;

use gh_label_sync::{
    config::parse_repository,
    sync::{SyncOperation, SyncResult},
    Error, GitHubClient, InvocationContext, Label, LabelSyncer, RepoRef, Result, SyncConfig,
};

/// gh-label-sync CLI
///
/// Every option can also be supplied through the environment GitHub Actions
/// provides, so the binary runs unchanged as an action step.
#[derive(Parser)]
#[command(
    name = "gh-label-sync",
    version,
    about = "Make a repository's labels match a YAML configuration file",
    long_about = "Reads the desired labels from a file in the invoking repository, then creates, \
    updates and deletes labels on the target repository until they match exactly."
)]
struct Cli {
    /// GitHub access token (falls back to GITHUB_TOKEN)
    #[arg(short = 't', long, env = "INPUT_GITHUB-TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// Path of the label configuration file, relative to the repository root
    #[arg(short = 'c', long, env = "INPUT_CONFIG-PATH")]
    config_path: String,

    /// Owner of the repository to reconcile (defaults to the invoking repository's owner)
    #[arg(long, env = "INPUT_OWNER")]
    owner: Option<String>,

    /// Name of the repository to reconcile (defaults to the invoking repository's name)
    #[arg(long, env = "INPUT_REPO")]
    repo: Option<String>,

    /// Invoking repository (owner/repo format), which holds the configuration file
    #[arg(long, env = "GITHUB_REPOSITORY")]
    source_repository: Option<String>,

    /// Revision to read the configuration file at (defaults to the default branch)
    #[arg(long, env = "GITHUB_SHA")]
    revision: Option<String>,

    /// GitHub API base URL, for GitHub Enterprise Server
    #[arg(long, env = "GITHUB_API_URL")]
    api_url: Option<String>,

    /// Dry run mode (don't make actual changes)
    #[arg(long)]
    dry_run: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        let message = format!("{e:#}");
        error!("{message}");

        if std::env::var_os("GITHUB_ACTIONS").is_some() {
            println!("::error::{}", escape_workflow_message(&message));
        }
        std::process::exit(1);
    }
}

/// Install the log subscriber; `RUST_LOG` overrides the default level
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Execute synchronization
async fn run(cli: Cli) -> anyhow::Result<()> {
    let token = get_access_token(cli.github_token)?;
    let context = build_context(
        cli.source_repository.as_deref(),
        cli.revision,
        cli.owner.as_deref(),
        cli.repo.as_deref(),
    )?;
    let target = context.resolve_target(cli.owner.as_deref(), cli.repo.as_deref());
    let api_url = parse_api_url(cli.api_url.as_deref())?;

    if cli.verbose {
        println!(
            "{} Initializing sync for repository: {}",
            "•".blue(),
            target.to_string().cyan()
        );

        if cli.dry_run {
            println!(
                "{} Running in dry-run mode (no changes will be made)",
                "!".yellow()
            );
        }
    }

    let client = GitHubClient::new(&token, api_url.as_ref())
        .context("Failed to create GitHub client")?;
    let config = SyncConfig {
        context,
        target,
        config_path: cli.config_path,
        dry_run: cli.dry_run,
    };

    let syncer = LabelSyncer::new(Arc::new(client), config)?;
    let result = syncer.sync_labels().await?;

    display_sync_result(&result, cli.verbose);
    result.ensure_success()?;

    Ok(())
}

/// Get access token
fn get_access_token(arg_token: Option<String>) -> Result<String> {
    arg_token
        .filter(|token| !token.trim().is_empty())
        .or_else(|| std::env::var("GITHUB_TOKEN").ok())
        .filter(|token| !token.trim().is_empty())
        .ok_or_else(|| {
            Error::config_validation(
                "GitHub access token is required. Set via --github-token, the github-token input, or GITHUB_TOKEN",
            )
        })
}

/// Build the invocation context
///
/// Without an explicit source repository, a fully specified target doubles as
/// the source.
fn build_context(
    source_repository: Option<&str>,
    revision: Option<String>,
    owner: Option<&str>,
    repo: Option<&str>,
) -> Result<InvocationContext> {
    fn non_empty(value: Option<&str>) -> Option<&str> {
        value.map(str::trim).filter(|v| !v.is_empty())
    }

    let source = match (non_empty(source_repository), non_empty(owner), non_empty(repo)) {
        (Some(source), _, _) => parse_repository(source)?,
        (None, Some(owner), Some(repo)) => RepoRef::new(owner, repo),
        _ => {
            return Err(Error::config_validation(
                "Repository is required. Set GITHUB_REPOSITORY, --source-repository, or both --owner and --repo",
            ))
        }
    };

    Ok(InvocationContext {
        source,
        revision: revision.filter(|r| !r.trim().is_empty()),
    })
}

/// Parse and validate the API base URL
fn parse_api_url(api_url: Option<&str>) -> Result<Option<url::Url>> {
    match api_url.map(str::trim).filter(|u| !u.is_empty()) {
        Some(raw) => url::Url::parse(raw)
            .map(Some)
            .map_err(|e| Error::config_validation(format!("Invalid API URL {raw}: {e}"))),
        None => Ok(None),
    }
}

/// Escape a message for a GitHub Actions workflow command
fn escape_workflow_message(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Label name with its color transition, e.g. `bug (#ff0000 -> #d73a4a)`
fn describe_update(current: &Label, new_label: &Label) -> String {
    format!(
        "{} (#{} -> #{})",
        new_label.name.cyan(),
        current.color,
        new_label.color
    )
}

/// Display synchronization results
fn display_sync_result(result: &SyncResult, verbose: bool) {
    if result.dry_run && result.has_changes() {
        println!("\n{} Sync preview (dry-run mode):", "•".blue());
    } else if result.has_changes() {
        println!("\n{} Sync completed:", "✓".green());
    } else if result.failures.is_empty() {
        println!("\n{} No changes required", "✓".green());
    }

    // Display statistics
    println!("  Created:   {}", result.created.to_string().green());
    println!("  Updated:   {}", result.updated.to_string().yellow());
    println!("  Deleted:   {}", result.deleted.to_string().red());
    println!("  Unchanged: {}", result.unchanged.to_string().white());

    if verbose {
        println!("\n{} Detailed operations:", "•".blue());
        for (i, operation) in result.operations.iter().enumerate() {
            let prefix = format!("  {}.", i + 1);
            match operation {
                SyncOperation::Create { label } => {
                    println!(
                        "{} {} Create label: {} (#{})",
                        prefix,
                        "+".green(),
                        label.name.cyan(),
                        label.color
                    );
                }
                SyncOperation::Update {
                    current,
                    new_label,
                    changes,
                } => {
                    println!(
                        "{} {} Update label: {}",
                        prefix,
                        "~".yellow(),
                        describe_update(current, new_label)
                    );
                    for change in changes {
                        println!("      {}", change.dimmed());
                    }
                }
                SyncOperation::Delete { label } => {
                    println!("{} {} Delete label: {}", prefix, "-".red(), label.name.red());
                }
                SyncOperation::NoChange { name } => {
                    println!("{} {} No change: {}", prefix, "=".white(), name.white());
                }
            }
        }
    }

    if !result.failures.is_empty() {
        eprintln!("\n{} Errors occurred:", "✗".red());
        for failure in &result.failures {
            eprintln!("  {}", failure.to_string().red());
        }
    }
}
