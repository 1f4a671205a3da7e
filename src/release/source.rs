//! Source trait for fetching raw release metadata from upstream

#[cfg(test)]
use mockall::automock;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::release::error::ClassifiedError;

/// One release as listed by the upstream feed
///
/// Payloads that do not match this shape are rejected at ingestion as
/// validation errors, so the rest of the pipeline only sees typed records.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawRelease {
    pub id: u64,
    pub tag_name: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub assets: Vec<RawAsset>,
}

/// A downloadable file attached to a release
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawAsset {
    pub name: String,
    pub browser_download_url: String,
    #[serde(default)]
    pub size: u64,
}

/// Trait for fetching releases and per-release metadata from upstream
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait ReleaseSource: Send + Sync {
    /// Fetches the release list (at most one page)
    ///
    /// # Arguments
    /// * `auth_token` - Bearer credential for the upstream API, may be empty
    ///
    /// # Returns
    /// * `Ok(Vec<RawRelease>)` - Releases in upstream order
    /// * `Err(ClassifiedError)` - If the request or payload validation fails
    async fn fetch_releases(&self, auth_token: &str) -> Result<Vec<RawRelease>, ClassifiedError>;

    /// Resolves the minimum runtime version a release depends on
    ///
    /// Returns an empty string when the manifest exists but cannot be decoded
    /// or lacks the dependency; only request failures are errors.
    async fn fetch_minimum_runtime_version(
        &self,
        auth_token: &str,
        tag: &str,
    ) -> Result<String, ClassifiedError>;
}
