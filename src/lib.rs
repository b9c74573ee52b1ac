//! # gh-label-sync
//!
//! Declarative GitHub label management: make a repository's labels exactly
//! match the set declared in a YAML file
//!
//! ## Features
//! - Paginated discovery of the current label set
//! - Name-based diff into create/update/delete operations
//! - Sequential application with aggregated failure reporting
//! - Dry-run mode

pub mod config;
pub mod error;
pub mod github;
pub mod sync;

pub use config::{Config, InvocationContext, Label, RepoRef, SyncConfig};
pub use error::{Error, Result};
pub use github::{GitHubClient, LabelService};
pub use sync::{LabelSyncer, SyncPlan, SyncResult};

/// Reconcile a repository's labels with an in-memory label list
///
/// Skips the configuration file entirely. Any failed label operation is
/// returned as an error.
///
/// # Examples
///
/// ```rust,no_run
/// use gh_label_sync::{Label, RepoRef};
///
/// #[tokio::main]
/// async fn main() -> gh_label_sync::Result<()> {
///     let labels = vec![Label::new("bug", "d73a4a").with_description("Something isn't working")];
///     let result = gh_label_sync::sync_repository_labels(
///         "your_github_token",
///         RepoRef::new("owner", "repo"),
///         &labels,
///         false,
///     )
///     .await?;
///
///     println!("Created {} labels", result.created);
///     Ok(())
/// }
/// ```
pub async fn sync_repository_labels(
    access_token: &str,
    target: RepoRef,
    labels: &[Label],
    dry_run: bool,
) -> Result<SyncResult> {
    config::check_unique_names(labels)?;

    let client = GitHubClient::new(access_token, None)?;
    let current = sync::fetch_current_labels(&client, &target).await?;
    let plan = sync::plan_sync(&current, labels);

    let result = sync::apply_plan(&client, &target, plan, dry_run).await;
    result.ensure_success()?;
    Ok(result)
}
