//! Configuration Management
//!
//! Label definitions, repository references and loading of the desired label
//! set from a file stored in the repository

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::github::LabelService;

/// Label
///
/// A label definition as declared in configuration or read from GitHub
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Label {
    /// Label name, compared by exact equality
    pub name: String,

    /// Label color, opaque to this crate
    pub color: String,

    /// Label description (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Label {
    /// Create a label without a description
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
            description: None,
        }
    }

    /// Attach a description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Description as sent to GitHub, which requires a string
    pub fn description_or_empty(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }

    /// Whether color and description already match `other`
    ///
    /// An absent description and an empty one are treated as the same value.
    pub fn matches(&self, other: &Label) -> bool {
        self.color == other.color && self.description_or_empty() == other.description_or_empty()
    }
}

/// Label configuration document
///
/// Only `labels` is read; any other top-level keys are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Desired label set, in declaration order
    pub labels: Vec<Label>,
}

impl Config {
    /// Validate configuration
    ///
    /// # Errors
    /// If two labels share the same name
    pub fn validate(&self) -> Result<()> {
        check_unique_names(&self.labels)
    }
}

/// Reject a desired label set that declares the same name twice
///
/// # Errors
/// `ConfigValidation` naming the first duplicated label
pub fn check_unique_names(labels: &[Label]) -> Result<()> {
    let mut seen = HashSet::new();
    for label in labels {
        if !seen.insert(label.name.as_str()) {
            return Err(Error::config_validation(format!(
                "Duplicate label name in configuration: {}",
                label.name
            )));
        }
    }
    Ok(())
}

/// Repository reference (`owner/repo`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Parse repository string into owner and name
///
/// # Arguments
/// - `repo`: Repository string in "owner/repo" format
///
/// # Errors
/// Returns an error if the format is invalid
pub fn parse_repository(repo: &str) -> Result<RepoRef> {
    match repo.split('/').collect::<Vec<_>>().as_slice() {
        [owner, name] if !owner.is_empty() && !name.is_empty() => Ok(RepoRef::new(*owner, *name)),
        _ => Err(Error::InvalidRepositoryFormat(repo.to_string())),
    }
}

/// Invocation context
///
/// The repository and revision that triggered the run. The configuration file
/// is always read from here, whatever repository is being reconciled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationContext {
    /// Repository the run was triggered from
    pub source: RepoRef,

    /// Commit SHA or ref to read the configuration at (default branch if None)
    pub revision: Option<String>,
}

impl InvocationContext {
    /// Resolve the repository to reconcile
    ///
    /// Missing or empty `owner`/`repo` inputs fall back to the invoking repository.
    pub fn resolve_target(&self, owner: Option<&str>, repo: Option<&str>) -> RepoRef {
        fn pick(input: Option<&str>, fallback: &str) -> String {
            match input.map(str::trim) {
                Some(value) if !value.is_empty() => value.to_string(),
                _ => fallback.to_string(),
            }
        }

        RepoRef {
            owner: pick(owner, &self.source.owner),
            repo: pick(repo, &self.source.repo),
        }
    }
}

/// Sync Configuration
///
/// Everything a single reconciliation run needs besides the API client
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Where the run was triggered from; the config file is read from here
    pub context: InvocationContext,

    /// Repository whose labels are reconciled
    pub target: RepoRef,

    /// Repository-relative path of the label configuration file
    pub config_path: String,

    /// Dry-run mode (plan and log, but don't make changes)
    pub dry_run: bool,
}

impl SyncConfig {
    /// Validate configuration
    ///
    /// # Errors
    /// - If the configuration path is empty
    /// - If the target owner or repository is empty
    pub fn validate(&self) -> Result<()> {
        if self.config_path.trim().is_empty() {
            return Err(Error::config_validation("Configuration path is required"));
        }

        if self.target.owner.is_empty() || self.target.repo.is_empty() {
            return Err(Error::InvalidRepositoryFormat(self.target.to_string()));
        }

        Ok(())
    }
}

/// Parse a label configuration document
///
/// # Arguments
/// - `content`: YAML text
/// - `path`: Path the text came from, used in error messages
///
/// # Errors
/// `ConfigParse` if the document does not decode, `ConfigValidation` if it
/// declares the same label twice
pub fn parse_config(content: &str, path: &str) -> Result<Config> {
    let config: Config = serde_yaml::from_str(content).map_err(|source| Error::ConfigParse {
        path: path.to_string(),
        source,
    })?;

    config.validate()?;
    Ok(config)
}

/// Config Loader
///
/// Reads the desired label set from a file in the invoking repository
pub struct ConfigLoader {
    context: InvocationContext,
}

impl ConfigLoader {
    pub fn new(context: InvocationContext) -> Self {
        Self { context }
    }

    /// Fetch and decode the configuration at `path`
    ///
    /// # Errors
    /// - `ConfigValidation` if `path` is empty
    /// - `ConfigLoad` if the file cannot be fetched
    /// - `ConfigParse` / `ConfigValidation` if it cannot be decoded
    pub async fn load(&self, client: &dyn LabelService, path: &str) -> Result<Config> {
        if path.trim().is_empty() {
            return Err(Error::config_validation("Configuration path is required"));
        }

        info!(path, source = %self.context.source, "Loading config from {path}");

        let source = &self.context.source;
        let content = client
            .get_file_content(
                &source.owner,
                &source.repo,
                path,
                self.context.revision.as_deref(),
            )
            .await
            .map_err(|e| Error::ConfigLoad {
                path: path.to_string(),
                source: Box::new(e),
            })?;

        let config = parse_config(&content, path)?;
        debug!(
            "Loaded Config:\n{}",
            serde_json::to_string(&config).unwrap_or_default()
        );

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::mock::MockLabelService;

    fn context() -> InvocationContext {
        InvocationContext {
            source: RepoRef::new("octo", "source"),
            revision: Some("abc123".to_string()),
        }
    }

    #[test]
    fn test_parse_repository() {
        assert_eq!(parse_repository("owner/repo").unwrap(), RepoRef::new("owner", "repo"));
        assert!(parse_repository("org/project").is_ok());

        assert!(parse_repository("repo").is_err()); // No slash
        assert!(parse_repository("/repo").is_err()); // No owner
        assert!(parse_repository("owner/").is_err()); // No repo name
        assert!(parse_repository("owner/repo/sub").is_err()); // Too many parts
    }

    #[test]
    fn test_resolve_target_defaults_to_source() {
        let ctx = context();
        assert_eq!(ctx.resolve_target(None, None), RepoRef::new("octo", "source"));
        assert_eq!(ctx.resolve_target(Some(""), Some("  ")), RepoRef::new("octo", "source"));
        assert_eq!(
            ctx.resolve_target(Some("other"), None),
            RepoRef::new("other", "source")
        );
        assert_eq!(
            ctx.resolve_target(Some("other"), Some("target")),
            RepoRef::new("other", "target")
        );
    }

    #[test]
    fn test_sync_config_validation() {
        let config = SyncConfig {
            context: context(),
            target: RepoRef::new("octo", "target"),
            config_path: ".github/labels.yml".to_string(),
            dry_run: false,
        };
        assert!(config.validate().is_ok());

        let no_path = SyncConfig {
            config_path: "".to_string(),
            ..config.clone()
        };
        assert!(no_path.validate().is_err());

        let no_owner = SyncConfig {
            target: RepoRef::new("", "target"),
            ..config
        };
        assert!(matches!(
            no_owner.validate(),
            Err(Error::InvalidRepositoryFormat(_))
        ));
    }

    #[test]
    fn test_label_matches_treats_missing_description_as_empty() {
        let absent = Label::new("bug", "d73a4a");
        let empty = Label::new("bug", "d73a4a").with_description("");
        let described = Label::new("bug", "d73a4a").with_description("Something is broken");

        assert!(absent.matches(&empty));
        assert!(empty.matches(&absent));
        assert!(!absent.matches(&described));
        assert!(!absent.matches(&Label::new("bug", "ffffff")));
    }

    #[test]
    fn test_parse_config_yaml() {
        let content = r#"
labels:
  - name: bug
    color: d73a4a
    description: Something isn't working
  - name: "good first issue"
    color: "7057ff"
"#;
        let config = parse_config(content, "labels.yml").unwrap();
        assert_eq!(config.labels.len(), 2);
        assert_eq!(
            config.labels[0],
            Label::new("bug", "d73a4a").with_description("Something isn't working")
        );
        assert_eq!(config.labels[1], Label::new("good first issue", "7057ff"));
    }

    #[test]
    fn test_parse_config_ignores_other_keys() {
        let content = "version: 2\nlabels:\n  - name: bug\n    color: red\n";
        let config = parse_config(content, "labels.yml").unwrap();
        assert_eq!(config.labels, vec![Label::new("bug", "red")]);
    }

    #[test]
    fn test_parse_config_empty_label_list() {
        let config = parse_config("labels: []\n", "labels.yml").unwrap();
        assert!(config.labels.is_empty());
    }

    #[test]
    fn test_parse_config_malformed() {
        let result = parse_config("labels: [\n  - name: bug", "labels.yml");
        assert!(matches!(result, Err(Error::ConfigParse { .. })));
    }

    #[test]
    fn test_parse_config_missing_color() {
        let result = parse_config("labels:\n  - name: bug\n", "labels.yml");
        assert!(matches!(result, Err(Error::ConfigParse { .. })));
    }

    #[test]
    fn test_parse_config_missing_labels_key() {
        let result = parse_config("other: true\n", "labels.yml");
        assert!(matches!(result, Err(Error::ConfigParse { .. })));
    }

    #[test]
    fn test_parse_config_rejects_duplicate_names() {
        let content = "labels:\n  - name: bug\n    color: red\n  - name: bug\n    color: blue\n";
        let err = parse_config(content, "labels.yml").unwrap_err();
        assert!(matches!(err, Error::ConfigValidation(_)));
        assert!(err.to_string().contains("bug"));
    }

    #[tokio::test]
    async fn test_loader_reads_from_source_at_revision() {
        let client = MockLabelService::new()
            .with_file(".github/labels.yml", "labels:\n  - name: bug\n    color: red\n");

        let config = ConfigLoader::new(context())
            .load(&client, ".github/labels.yml")
            .await
            .unwrap();

        assert_eq!(config.labels, vec![Label::new("bug", "red")]);
        assert_eq!(
            client.file_requests(),
            vec![(
                "octo/source".to_string(),
                ".github/labels.yml".to_string(),
                Some("abc123".to_string())
            )]
        );
    }

    #[tokio::test]
    async fn test_loader_missing_file_is_load_error() {
        let client = MockLabelService::new();
        let result = ConfigLoader::new(context()).load(&client, "missing.yml").await;
        assert!(matches!(result, Err(Error::ConfigLoad { ref path, .. }) if path == "missing.yml"));
    }

    #[tokio::test]
    async fn test_loader_malformed_file_is_parse_error() {
        let client = MockLabelService::new().with_file("labels.yml", "labels: {{{");
        let result = ConfigLoader::new(context()).load(&client, "labels.yml").await;
        assert!(matches!(result, Err(Error::ConfigParse { .. })));
    }

    #[tokio::test]
    async fn test_loader_rejects_empty_path() {
        let client = MockLabelService::new();
        let result = ConfigLoader::new(context()).load(&client, " ").await;
        assert!(matches!(result, Err(Error::ConfigValidation(_))));
        assert!(client.file_requests().is_empty());
    }
}
