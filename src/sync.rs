//! Label Synchronization Functionality
//!
//! Fetching the current label set, planning the changes that converge it on
//! the configured set, and applying them

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{check_unique_names, ConfigLoader, Label, RepoRef, SyncConfig};
use crate::error::{Error, LabelFailure, Result};
use crate::github::LabelService;

/// Labels requested per page when listing
pub const PAGE_SIZE: u8 = 100;

/// Types of label synchronization operations
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOperation {
    /// Create a label
    Create { label: Label },

    /// Update color and/or description of an existing label
    Update {
        current: Label,
        new_label: Label,
        changes: Vec<String>,
    },

    /// Delete a label that is not in the configuration
    Delete { label: Label },

    /// No change
    NoChange { name: String },
}

impl SyncOperation {
    /// Name of the label this operation concerns
    pub fn name(&self) -> &str {
        match self {
            SyncOperation::Create { label } | SyncOperation::Delete { label } => &label.name,
            SyncOperation::Update { new_label, .. } => &new_label.name,
            SyncOperation::NoChange { name } => name,
        }
    }

    fn action(&self) -> &'static str {
        match self {
            SyncOperation::Create { .. } => "create",
            SyncOperation::Update { .. } => "update",
            SyncOperation::Delete { .. } => "delete",
            SyncOperation::NoChange { .. } => "none",
        }
    }
}

/// Synchronization plan
///
/// Deletions come first in the order of the current label set, followed by
/// creations, updates and no-ops in the order of the desired set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncPlan {
    pub operations: Vec<SyncOperation>,
}

impl SyncPlan {
    /// Labels staged for removal
    pub fn to_delete(&self) -> Vec<&Label> {
        self.operations
            .iter()
            .filter_map(|op| match op {
                SyncOperation::Delete { label } => Some(label),
                _ => None,
            })
            .collect()
    }

    /// Labels staged for creation
    pub fn to_create(&self) -> Vec<&Label> {
        self.operations
            .iter()
            .filter_map(|op| match op {
                SyncOperation::Create { label } => Some(label),
                _ => None,
            })
            .collect()
    }

    /// Desired labels staged for update
    pub fn to_update(&self) -> Vec<&Label> {
        self.operations
            .iter()
            .filter_map(|op| match op {
                SyncOperation::Update { new_label, .. } => Some(new_label),
                _ => None,
            })
            .collect()
    }

    /// Whether applying the plan changes anything
    pub fn has_changes(&self) -> bool {
        self.operations
            .iter()
            .any(|op| !matches!(op, SyncOperation::NoChange { .. }))
    }
}

/// Synchronization result
#[derive(Debug, Clone)]
pub struct SyncResult {
    /// Operations that were applied (or would be, in a dry run)
    pub operations: Vec<SyncOperation>,

    /// Number of labels created
    pub created: u32,

    /// Number of labels updated
    pub updated: u32,

    /// Number of labels deleted
    pub deleted: u32,

    /// Number of labels unchanged
    pub unchanged: u32,

    /// Whether this is a dry run
    pub dry_run: bool,

    /// Operations that failed
    pub failures: Vec<LabelFailure>,
}

impl SyncResult {
    /// Create a new empty synchronization result
    pub fn new(dry_run: bool) -> Self {
        Self {
            operations: Vec::new(),
            created: 0,
            updated: 0,
            deleted: 0,
            unchanged: 0,
            dry_run,
            failures: Vec::new(),
        }
    }

    /// Add an operation and update statistics
    pub fn add_operation(&mut self, operation: SyncOperation) {
        match &operation {
            SyncOperation::Create { .. } => self.created += 1,
            SyncOperation::Update { .. } => self.updated += 1,
            SyncOperation::Delete { .. } => self.deleted += 1,
            SyncOperation::NoChange { .. } => self.unchanged += 1,
        }
        self.operations.push(operation);
    }

    /// Record a failed operation
    pub fn add_failure(&mut self, operation: &SyncOperation, error: &Error) {
        self.failures.push(LabelFailure {
            action: operation.action(),
            label: operation.name().to_string(),
            reason: error.to_string(),
        });
    }

    /// Whether changes occurred (or would occur)
    pub fn has_changes(&self) -> bool {
        self.created > 0 || self.updated > 0 || self.deleted > 0
    }

    /// Get total number of operations
    pub fn total_operations(&self) -> u32 {
        self.created + self.updated + self.deleted + self.unchanged
    }

    /// Turn recorded failures into an error
    ///
    /// # Errors
    /// `LabelOperation` listing every failed label if any operation failed
    pub fn ensure_success(&self) -> Result<()> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(Error::LabelOperation {
                failures: self.failures.clone(),
            })
        }
    }
}

/// Get all labels from the repository
///
/// Requests pages of [`PAGE_SIZE`] until one comes back short.
///
/// # Errors
/// `LabelList` if any page fails; no partial list is returned
pub async fn fetch_current_labels(
    client: &dyn LabelService,
    target: &RepoRef,
) -> Result<Vec<Label>> {
    let mut labels = Vec::new();
    let mut page = 1u32;

    loop {
        let items = client
            .list_labels(&target.owner, &target.repo, page, PAGE_SIZE)
            .await
            .map_err(|e| Error::LabelList {
                owner: target.owner.clone(),
                repo: target.repo.clone(),
                page,
                source: Box::new(e),
            })?;

        let count = items.len();
        labels.extend(items);

        if count < PAGE_SIZE as usize {
            break;
        }

        page += 1;
    }

    let listing = serde_json::to_string(&labels)?;
    info!(
        owner = %target.owner,
        repo = %target.repo,
        count = labels.len(),
        "Existing Labels: {listing}"
    );

    Ok(labels)
}

/// Plan synchronization operations
///
/// # Arguments
/// - `current`: Labels on the repository
/// - `desired`: Labels from configuration
///
/// # Returns
/// Deletions for current labels missing from `desired`, then one operation per
/// desired label. Matching is by exact name.
pub fn plan_sync(current: &[Label], desired: &[Label]) -> SyncPlan {
    let desired_names: HashSet<&str> = desired.iter().map(|l| l.name.as_str()).collect();

    let mut current_by_name: HashMap<&str, &Label> = HashMap::new();
    for label in current {
        current_by_name.entry(label.name.as_str()).or_insert(label);
    }

    let mut operations: Vec<SyncOperation> = current
        .iter()
        .filter(|label| !desired_names.contains(label.name.as_str()))
        .map(|label| SyncOperation::Delete {
            label: label.clone(),
        })
        .collect();

    for target in desired {
        let operation = match current_by_name.get(target.name.as_str()) {
            None => SyncOperation::Create {
                label: target.clone(),
            },
            Some(existing) => check_label_changes(existing, target),
        };
        operations.push(operation);
    }

    SyncPlan { operations }
}

/// Check label changes
///
/// # Arguments
/// - `current`: Current label
/// - `target`: Target label
///
/// # Returns
/// Required operation
fn check_label_changes(current: &Label, target: &Label) -> SyncOperation {
    if current.matches(target) {
        return SyncOperation::NoChange {
            name: target.name.clone(),
        };
    }

    let mut changes = Vec::new();

    if current.color != target.color {
        changes.push(format!("color: {} -> {}", current.color, target.color));
    }

    if current.description_or_empty() != target.description_or_empty() {
        let old_desc = current.description.as_deref().unwrap_or("(none)");
        let new_desc = target.description.as_deref().unwrap_or("(none)");
        changes.push(format!("description: {} -> {}", old_desc, new_desc));
    }

    SyncOperation::Update {
        current: current.clone(),
        new_label: target.clone(),
        changes,
    }
}

/// Apply a plan
///
/// Operations run one at a time in plan order. A failed operation is logged
/// and recorded, and the remaining operations still run.
pub async fn apply_plan(
    client: &dyn LabelService,
    target: &RepoRef,
    plan: SyncPlan,
    dry_run: bool,
) -> SyncResult {
    let mut result = SyncResult::new(dry_run);

    for operation in plan.operations {
        match execute_operation(client, target, &operation, dry_run).await {
            Ok(()) => result.add_operation(operation),
            Err(e) => {
                warn!(
                    owner = %target.owner,
                    repo = %target.repo,
                    label = operation.name(),
                    error = %e,
                    "Failed to {} label",
                    operation.action()
                );
                result.add_failure(&operation, &e);
            }
        }
    }

    result
}

/// Execute an operation
///
/// The action is logged before the remote call is made.
///
/// # Errors
/// Returns an error if the remote call fails
async fn execute_operation(
    client: &dyn LabelService,
    target: &RepoRef,
    operation: &SyncOperation,
    dry_run: bool,
) -> Result<()> {
    let (owner, repo) = (target.owner.as_str(), target.repo.as_str());

    match operation {
        SyncOperation::Create { label } => {
            let payload = serde_json::to_string(label)?;
            info!(
                "Label: {} is being created in {}\n{}",
                label.name, target, payload
            );
            if !dry_run {
                client.create_label(owner, repo, label).await?;
            }
        }
        SyncOperation::Update {
            new_label, changes, ..
        } => {
            let payload = serde_json::to_string(new_label)?;
            info!(
                changes = %changes.join(", "),
                "Label: {} is being updated in {}\n{}",
                new_label.name,
                target,
                payload
            );
            if !dry_run {
                client.update_label(owner, repo, new_label).await?;
            }
        }
        SyncOperation::Delete { label } => {
            info!("Label: {} is being removed from {}", label.name, target);
            if !dry_run {
                client.delete_label(owner, repo, &label.name).await?;
            }
        }
        SyncOperation::NoChange { name } => {
            debug!("Label: {} is already up to date in {}", name, target);
        }
    }

    Ok(())
}

/// Label Synchronization Engine
///
/// Synchronizes a repository's labels with the configuration file
pub struct LabelSyncer {
    client: Arc<dyn LabelService>,
    config: SyncConfig,
}

impl LabelSyncer {
    /// Create a new label synchronization engine
    ///
    /// # Errors
    /// Returns an error if configuration validation fails
    pub fn new(client: Arc<dyn LabelService>, config: SyncConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { client, config })
    }

    /// Synchronize labels
    ///
    /// Loads the configuration, fetches current labels, then plans and applies
    /// the changes.
    ///
    /// # Errors
    /// Returns an error if the configuration cannot be loaded or the current
    /// labels cannot be listed. Failed label operations are reported in the
    /// result instead; see [`SyncResult::ensure_success`].
    pub async fn sync_labels(&self) -> Result<SyncResult> {
        let config = ConfigLoader::new(self.config.context.clone())
            .load(self.client.as_ref(), &self.config.config_path)
            .await?;

        self.reconcile(&config.labels).await
    }

    /// Converge the target repository on `desired`
    ///
    /// # Errors
    /// Returns an error if `desired` repeats a name or the current labels
    /// cannot be listed
    pub async fn reconcile(&self, desired: &[Label]) -> Result<SyncResult> {
        check_unique_names(desired)?;

        let target = &self.config.target;
        let current = fetch_current_labels(self.client.as_ref(), target).await?;

        let plan = plan_sync(&current, desired);
        Ok(apply_plan(self.client.as_ref(), target, plan, self.config.dry_run).await)
    }
}
