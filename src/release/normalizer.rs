//! Normalization of raw upstream releases into a snapshot
//!
//! Releases are dropped when their tag is not a semantic version or when they
//! lack the distributable artifact. Minimum runtime versions are resolved
//! concurrently; a failed lookup keeps the release and records the error.

use futures::StreamExt;
use futures::stream;
use tracing::{debug, info, warn};

use crate::config::MAX_CONCURRENT_LOOKUPS;
use crate::release::error::{ClassifiedError, ErrorCode};
use crate::release::semver::{parse_version, sort_descending};
use crate::release::source::{RawRelease, ReleaseSource};
use crate::release::types::{ReleaseRecord, ReleaseSnapshot};

/// Outcome of a normalization pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    pub snapshot: ReleaseSnapshot,
    /// Most severe non-fatal error met while resolving per-release metadata
    pub error: Option<ClassifiedError>,
}

pub struct ReleaseNormalizer {
    artifact_name: String,
}

impl ReleaseNormalizer {
    pub fn new(artifact_name: &str) -> Self {
        Self {
            artifact_name: artifact_name.to_string(),
        }
    }

    /// Fetch the release list and normalize it
    ///
    /// Validation errors (unexpected payload shape) become an empty snapshot
    /// without an error; every other fetch failure is returned as is.
    pub async fn collect(
        &self,
        source: &dyn ReleaseSource,
        auth_token: &str,
    ) -> Result<Normalized, ClassifiedError> {
        let raw = match source.fetch_releases(auth_token).await {
            Ok(raw) => raw,
            Err(e) if e.code == ErrorCode::ValidationError => {
                warn!("Suppressing malformed upstream release payload: {}", e);
                return Ok(Normalized::default());
            }
            Err(e) => return Err(e),
        };

        if raw.is_empty() {
            info!("Upstream returned no releases");
        }

        Ok(self.normalize(source, auth_token, raw).await)
    }

    /// Build a snapshot from raw releases, resolving minimum runtime versions
    pub async fn normalize(
        &self,
        source: &dyn ReleaseSource,
        auth_token: &str,
        raw: Vec<RawRelease>,
    ) -> Normalized {
        let total = raw.len();
        let candidates: Vec<_> = raw
            .into_iter()
            .filter_map(|release| {
                let Some(version) = parse_version(&release.tag_name) else {
                    debug!("Skipping tag {}: not a semantic version", release.tag_name);
                    return None;
                };
                let Some(asset) = release
                    .assets
                    .iter()
                    .find(|asset| asset.name == self.artifact_name)
                    .cloned()
                else {
                    debug!(
                        "Skipping tag {}: no {} asset",
                        release.tag_name, self.artifact_name
                    );
                    return None;
                };
                Some((version, release, asset))
            })
            .collect();

        // Ordered buffering keeps results aligned with `candidates`
        let lookups: Vec<_> = stream::iter(candidates.iter().map(|(_, release, _)| {
            source.fetch_minimum_runtime_version(auth_token, &release.tag_name)
        }))
        .buffered(MAX_CONCURRENT_LOOKUPS)
        .collect()
        .await;

        let mut error = None;
        let mut entries = Vec::with_capacity(candidates.len());

        for ((version, release, asset), lookup) in candidates.into_iter().zip(lookups) {
            let minimum_runtime_version = match lookup {
                Ok(v) => v,
                Err(e) if e.code == ErrorCode::ValidationError => {
                    debug!("Ignoring malformed manifest for {}: {}", release.tag_name, e);
                    String::new()
                }
                Err(e) => {
                    warn!(
                        "Minimum runtime lookup failed for {}: {}",
                        release.tag_name, e
                    );
                    error = ClassifiedError::most_severe(error, e);
                    String::new()
                }
            };

            let record = ReleaseRecord {
                version: version.to_string(),
                released_at: release.published_at,
                minimum_runtime_version,
                download_url: asset.browser_download_url,
                size_bytes: asset.size,
                is_prerelease: release.prerelease,
                upstream_id: release.id,
                changelog: release.body.unwrap_or_default(),
            };
            entries.push((version, record));
        }

        sort_descending(&mut entries);
        let snapshot: ReleaseSnapshot = entries.into_iter().map(|(_, record)| record).collect();

        info!(
            "Normalized {} of {} upstream releases",
            snapshot.len(),
            total
        );

        Normalized { snapshot, error }
    }
}
