//! Served operations over the release pipeline
//!
//! Every method maps one client-facing operation onto the orchestrator and the
//! query views, and never fails outright: problems are expressed as status
//! codes inside the returned [`ApiResponse`].

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::{error, info, warn};

use crate::api::envelope::ApiResponse;
use crate::config::GatewayConfig;
use crate::logging::redact;
use crate::release::cache::KeyValueStore;
use crate::release::error::CacheError;
use crate::release::normalizer::ReleaseNormalizer;
use crate::release::orchestrator::FreshnessOrchestrator;
use crate::release::query;
use crate::release::secret::RefreshSecret;
use crate::release::source::ReleaseSource;
use crate::release::types::SnapshotRead;

pub struct ReleaseService<S: KeyValueStore> {
    orchestrator: FreshnessOrchestrator<S>,
    secret: RefreshSecret<S>,
}

impl<S: KeyValueStore> ReleaseService<S> {
    pub fn new(orchestrator: FreshnessOrchestrator<S>, secret: RefreshSecret<S>) -> Self {
        Self {
            orchestrator,
            secret,
        }
    }

    /// Wire the pipeline from configuration, sharing one store for snapshot and secret
    pub fn from_config(
        store: Arc<S>,
        source: Arc<dyn ReleaseSource>,
        config: &GatewayConfig,
    ) -> Self {
        let orchestrator = FreshnessOrchestrator::new(
            store.clone(),
            source,
            ReleaseNormalizer::new(&config.upstream.artifact_name),
            &config.upstream.token,
        )
        .with_cache(&config.cache.key, Duration::from_secs(config.cache.ttl));

        let secret = RefreshSecret::new(store, &config.cache.secret_key);

        Self::new(orchestrator, secret)
    }

    /// Highest released version
    pub async fn latest(&self) -> ApiResponse {
        let read = self.orchestrator.read_with_retry().await;
        if let Some(response) = unavailable(&read) {
            return response;
        }

        match query::latest(&read.snapshot) {
            Some(record) => ApiResponse::ok(record, &read),
            None => ApiResponse::not_found("No releases available", &read),
        }
    }

    /// One release by version, or `latest`
    pub async fn version(&self, version: &str) -> ApiResponse {
        let read = self.orchestrator.read_with_retry().await;
        if let Some(response) = unavailable(&read) {
            return response;
        }

        match query::by_version(&read.snapshot, version) {
            Some(record) => ApiResponse::ok(record, &read),
            None => ApiResponse::not_found(format!("Version {} not found", version), &read),
        }
    }

    /// Release notes for every version newer than `current`
    pub async fn changelog(&self, current: &str) -> ApiResponse {
        let current = match query::parse_current(current) {
            Ok(current) => current,
            Err(e) => return ApiResponse::bad_request(e.to_string()),
        };

        let read = self.orchestrator.read_with_retry().await;
        if let Some(response) = unavailable(&read) {
            return response;
        }

        ApiResponse::ok(query::changelog_since(&read.snapshot, &current), &read)
    }

    pub async fn count(&self) -> ApiResponse {
        let read = self.orchestrator.read_with_retry().await;
        if let Some(response) = unavailable(&read) {
            return response;
        }

        ApiResponse::ok(json!({ "count": query::count(&read.snapshot) }), &read)
    }

    /// Support status of an installed version
    pub async fn status(&self, current: &str) -> ApiResponse {
        let current = match query::parse_current(current) {
            Ok(current) => current,
            Err(e) => return ApiResponse::bad_request(e.to_string()),
        };

        let read = self.orchestrator.read_with_retry().await;
        if let Some(response) = unavailable(&read) {
            return response;
        }

        ApiResponse::ok(query::status(&read.snapshot, &current), &read)
    }

    /// Forced refresh, gated by a bearer credential
    ///
    /// `authorization` is the raw `Authorization` header value. The credential
    /// is checked before anything is fetched.
    pub async fn refresh(&self, authorization: Option<&str>) -> ApiResponse {
        let Some(token) = authorization.and_then(bearer_token) else {
            warn!("Refresh rejected: missing bearer credential");
            return ApiResponse::unauthorized("Missing bearer credential");
        };

        match self.secret.verify(token).await {
            Ok(true) => {}
            Ok(false) => {
                warn!("Refresh rejected: invalid credential {}", redact(token));
                return ApiResponse::unauthorized("Invalid refresh credential");
            }
            Err(e) => {
                error!("Refresh rejected: could not load refresh secret: {}", e);
                return ApiResponse::unauthorized("Refresh credential could not be verified");
            }
        }

        let read = self.orchestrator.read(true).await;
        if let Some(response) = unavailable(&read) {
            return response;
        }

        info!(
            "Refresh served {} releases from {}",
            read.snapshot.len(),
            read.source.as_str()
        );

        ApiResponse::ok(
            json!({
                "count": query::count(&read.snapshot),
                "latest": query::latest(&read.snapshot).map(|r| r.version.as_str()),
            }),
            &read,
        )
    }

    /// Drop the cached snapshot so the next read fetches upstream
    pub async fn purge(&self) -> Result<(), CacheError> {
        self.orchestrator.purge().await
    }

    /// Store a new refresh secret and forget the memoized one
    pub async fn provision_secret(&self, value: &str) -> Result<(), CacheError> {
        self.secret.provision(value).await
    }
}

fn unavailable(read: &SnapshotRead) -> Option<ApiResponse> {
    if !read.is_unavailable() {
        return None;
    }
    read.error.as_ref().map(ApiResponse::unavailable)
}

/// Extract the credential from an `Authorization: Bearer <token>` header value
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
