//! GitHub API Client
//!
//! The label capability the reconciler needs, and its implementation on top of
//! the GitHub REST API

use async_trait::async_trait;
use octocrab::Octocrab;
use serde_json::json;
use tracing::debug;

use crate::config::Label;
use crate::error::{Error, Result};

/// Encode a string for use in URL path segments (RFC 3986 with UTF-8 support)
///
/// Only unreserved characters (A-Z, a-z, 0-9, -, ., _, ~) are left unencoded.
///
/// # Arguments
/// - `input`: The string to encode
///
/// # Returns
/// URL-encoded string safe for use in path segments
fn encode_path_segment(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            // RFC 3986 unreserved characters
            'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '.' | '_' | '~' => c.to_string(),
            // Everything else gets percent-encoded as UTF-8 bytes
            _ => c
                .to_string()
                .bytes()
                .map(|b| format!("%{:02X}", b))
                .collect::<String>(),
        })
        .collect()
}

/// Repository label capability
///
/// Everything the sync engine needs from the hosting service. Each call is a
/// single remote request; no retries or batching happen behind it.
#[async_trait]
pub trait LabelService: Send + Sync {
    /// List one page of labels (pages are 1-based)
    async fn list_labels(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
        per_page: u8,
    ) -> Result<Vec<Label>>;

    /// Create a label
    async fn create_label(&self, owner: &str, repo: &str, label: &Label) -> Result<()>;

    /// Update the color and description of the label named `label.name`
    async fn update_label(&self, owner: &str, repo: &str, label: &Label) -> Result<()>;

    /// Delete a label by name
    async fn delete_label(&self, owner: &str, repo: &str, name: &str) -> Result<()>;

    /// Fetch a file as text, decoding any transport encoding
    ///
    /// `revision` of `None` reads from the default branch.
    async fn get_file_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        revision: Option<&str>,
    ) -> Result<String>;
}

impl From<octocrab::models::Label> for Label {
    fn from(label: octocrab::models::Label) -> Self {
        Label {
            name: label.name,
            color: label.color,
            description: label.description,
        }
    }
}

/// GitHub API Client
///
/// `LabelService` backed by the GitHub REST API
pub struct GitHubClient {
    octocrab: Octocrab,
}

impl GitHubClient {
    /// Create a new GitHub client
    ///
    /// # Arguments
    /// - `access_token`: GitHub access token
    /// - `api_url`: API base URL (GitHub Enterprise); `None` for api.github.com
    ///
    /// # Errors
    /// Returns an error if client initialization fails
    pub fn new(access_token: &str, api_url: Option<&url::Url>) -> Result<Self> {
        let mut builder = Octocrab::builder();
        if let Some(api_url) = api_url {
            builder = builder.base_uri(api_url.as_str())?;
        }

        let octocrab = builder.personal_token(access_token.to_string()).build()?;

        Ok(Self { octocrab })
    }
}

#[async_trait]
impl LabelService for GitHubClient {
    async fn list_labels(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
        per_page: u8,
    ) -> Result<Vec<Label>> {
        debug!(owner, repo, page, per_page, "Listing labels");
        let response = self
            .octocrab
            .issues(owner, repo)
            .list_labels_for_repo()
            .page(page)
            .per_page(per_page)
            .send()
            .await?;

        Ok(response.items.into_iter().map(Label::from).collect())
    }

    async fn create_label(&self, owner: &str, repo: &str, label: &Label) -> Result<()> {
        self.octocrab
            .issues(owner, repo)
            .create_label(&label.name, &label.color, label.description_or_empty())
            .await?;

        Ok(())
    }

    async fn update_label(&self, owner: &str, repo: &str, label: &Label) -> Result<()> {
        // octocrab v0.38 has no typed update, so PATCH the label route directly
        let route = format!(
            "/repos/{}/{}/labels/{}",
            owner,
            repo,
            encode_path_segment(&label.name)
        );
        let body = json!({
            "color": label.color,
            "description": label.description_or_empty(),
        });

        let _: octocrab::models::Label = self.octocrab.patch(route, Some(&body)).await?;
        Ok(())
    }

    async fn delete_label(&self, owner: &str, repo: &str, name: &str) -> Result<()> {
        // URL encode the label name to handle spaces, special characters, and UTF-8
        let encoded_name = encode_path_segment(name);
        self.octocrab
            .issues(owner, repo)
            .delete_label(&encoded_name)
            .await?;

        Ok(())
    }

    async fn get_file_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        revision: Option<&str>,
    ) -> Result<String> {
        let handler = self.octocrab.repos(owner, repo);
        let mut request = handler.get_content().path(path);
        if let Some(revision) = revision {
            request = request.r#ref(revision);
        }

        let content_items = request.send().await?;

        content_items
            .items
            .first()
            .and_then(|file| file.decoded_content())
            .ok_or_else(|| Error::EmptyContent(path.to_string()))
    }
}
