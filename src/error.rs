//! Error Handling
//!
//! Error type definitions used in gh-label-sync

use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Error types for gh-label-sync
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to load configuration from {path}: {source}")]
    ConfigLoad {
        path: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Failed to parse configuration {path}: {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to list labels for {owner}/{repo} (page {page}): {source}")]
    LabelList {
        owner: String,
        repo: String,
        page: u32,
        #[source]
        source: Box<Error>,
    },

    #[error("{} label operation(s) failed: {}", .failures.len(), FailureList(.failures))]
    LabelOperation { failures: Vec<LabelFailure> },

    #[error("GitHub API error: {0}")]
    GitHubApi(#[from] octocrab::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    ConfigValidation(String),

    #[error("Invalid repository format: {0} (expected 'owner/repo')")]
    InvalidRepositoryFormat(String),

    #[error("Remote file has no decodable content: {0}")]
    EmptyContent(String),

    /// Failure reported by a `LabelService` that has no richer error type
    #[error("Remote request failed: {0}")]
    Remote(String),
}

impl Error {
    /// Create a new configuration validation error
    pub fn config_validation<S: Into<String>>(message: S) -> Self {
        Error::ConfigValidation(message.into())
    }
}

/// A single failed create/update/delete call
#[derive(Debug, Clone, PartialEq)]
pub struct LabelFailure {
    /// Operation kind ("create", "update" or "delete")
    pub action: &'static str,

    /// Label name the operation targeted
    pub label: String,

    /// Rendered error message
    pub reason: String,
}

impl fmt::Display for LabelFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}': {}", self.action, self.label, self.reason)
    }
}

struct FailureList<'a>(&'a [LabelFailure]);

impl fmt::Display for FailureList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_operation_message_lists_every_failure() {
        let err = Error::LabelOperation {
            failures: vec![
                LabelFailure {
                    action: "create",
                    label: "bug".to_string(),
                    reason: "Validation Failed".to_string(),
                },
                LabelFailure {
                    action: "delete",
                    label: "wontfix".to_string(),
                    reason: "Not Found".to_string(),
                },
            ],
        };

        assert_eq!(
            err.to_string(),
            "2 label operation(s) failed: create 'bug': Validation Failed; delete 'wontfix': Not Found"
        );
    }

    #[test]
    fn test_config_load_wraps_source() {
        let err = Error::ConfigLoad {
            path: ".github/labels.yml".to_string(),
            source: Box::new(Error::EmptyContent(".github/labels.yml".to_string())),
        };
        let message = err.to_string();
        assert!(message.starts_with("Failed to load configuration from .github/labels.yml"));
        assert!(message.contains("no decodable content"));
    }
}
