//! Upstream release resolution.
//!
//! Asks the release-metadata endpoint (GitHub's "latest release" API by
//! default) for the current tag. One request, no retries: if this fails the
//! whole run stops.

use reqwest::Client;
use reqwest::header::{ACCEPT, USER_AGENT};
use thiserror::Error;

use magiskfrida_schema::{Release, ReleaseError};

/// Why the latest release could not be determined.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The request could not be sent or the body not read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("Release endpoint {url} returned {status}")]
    Status {
        /// Endpoint that was queried.
        url: String,
        /// Status it answered with.
        status: reqwest::StatusCode,
    },

    /// The body is not JSON.
    #[error("Malformed release metadata: {0}")]
    Malformed(#[from] serde_json::Error),

    /// `tag_name` is absent or not a string.
    #[error("Release metadata has no string 'tag_name' field")]
    MissingTag,

    /// The tag cannot be turned into a [`Release`].
    #[error("Invalid release tag: {0}")]
    InvalidTag(#[from] ReleaseError),
}

/// Resolves the latest upstream [`Release`].
#[derive(Debug, Clone)]
pub struct ReleaseResolver {
    client: Client,
    endpoint: String,
}

impl ReleaseResolver {
    /// Create a resolver for `endpoint`.
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// The endpoint this resolver queries.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetch the metadata document and extract its `tag_name`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] if the endpoint is unreachable, answers with a
    /// non-success status, or the document has no usable tag.
    pub async fn resolve(&self) -> Result<Release, ResolveError> {
        tracing::debug!("Resolving latest release from {}", self.endpoint);

        let response = self
            .client
            .get(&self.endpoint)
            .header(USER_AGENT, crate::USER_AGENT)
            .header(ACCEPT, "application/vnd.github+json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::Status {
                url: self.endpoint.clone(),
                status,
            });
        }

        let body = response.text().await?;
        let release = parse_latest(&body)?;

        tracing::info!("Latest release is {release}");
        Ok(release)
    }
}

/// Extract the release from a "latest release" document.
///
/// # Errors
///
/// Returns [`ResolveError::Malformed`] for invalid JSON,
/// [`ResolveError::MissingTag`] when `tag_name` is absent or not a string, and
/// [`ResolveError::InvalidTag`] when the tag cannot form a [`Release`].
pub fn parse_latest(body: &str) -> Result<Release, ResolveError> {
    let document: serde_json::Value = serde_json::from_str(body)?;
    let tag = document
        .get("tag_name")
        .and_then(serde_json::Value::as_str)
        .ok_or(ResolveError::MissingTag)?;
    Ok(Release::new(tag)?)
}
