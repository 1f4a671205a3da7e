//! Release source test utilities

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use release_gateway::config::DEFAULT_ARTIFACT_NAME;
use release_gateway::release::error::ClassifiedError;
use release_gateway::release::source::{RawAsset, RawRelease, ReleaseSource};

/// Source serving a fixed release list, or a fixed failure
pub struct StaticSource {
    releases: Mutex<Result<Vec<RawRelease>, ClassifiedError>>,
    runtime_version: String,
    fetches: AtomicUsize,
}

impl StaticSource {
    pub fn new(releases: Vec<RawRelease>) -> Self {
        Self {
            releases: Mutex::new(Ok(releases)),
            runtime_version: "28.0.0".to_string(),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: ClassifiedError) -> Self {
        let source = Self::new(vec![]);
        source.fail_with(error);
        source
    }

    pub fn serve(&self, releases: Vec<RawRelease>) {
        *self.releases.lock().unwrap() = Ok(releases);
    }

    pub fn fail_with(&self, error: ClassifiedError) {
        *self.releases.lock().unwrap() = Err(error);
    }

    /// Number of release list fetches so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReleaseSource for StaticSource {
    async fn fetch_releases(&self, _auth_token: &str) -> Result<Vec<RawRelease>, ClassifiedError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.releases.lock().unwrap().clone()
    }

    async fn fetch_minimum_runtime_version(
        &self,
        _auth_token: &str,
        _tag: &str,
    ) -> Result<String, ClassifiedError> {
        Ok(self.runtime_version.clone())
    }
}

/// A release carrying the default artifact and `notes` as its body
pub fn raw_release(tag: &str, notes: &str) -> RawRelease {
    RawRelease {
        id: 1,
        tag_name: tag.to_string(),
        published_at: None,
        prerelease: false,
        body: Some(notes.to_string()),
        assets: vec![RawAsset {
            name: DEFAULT_ARTIFACT_NAME.to_string(),
            browser_download_url: format!("https://dl.example.com/{tag}/{DEFAULT_ARTIFACT_NAME}"),
            size: 1024,
        }],
    }
}
