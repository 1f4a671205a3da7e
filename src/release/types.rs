//! Canonical release entities shared by the pipeline

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::release::error::ClassifiedError;
use crate::release::semver::{canonical_version, parse_version, sort_descending};

/// One normalized release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRecord {
    /// Canonical semantic version (no leading `v`)
    pub version: String,
    #[serde(default)]
    pub released_at: Option<DateTime<Utc>>,
    /// Best-effort; empty when the manifest lookup failed
    #[serde(default)]
    pub minimum_runtime_version: String,
    pub download_url: String,
    pub size_bytes: u64,
    #[serde(default)]
    pub is_prerelease: bool,
    pub upstream_id: u64,
    #[serde(default)]
    pub changelog: String,
}

/// All releases known as of one fetch or cache read, keyed by version
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReleaseSnapshot {
    releases: BTreeMap<String, ReleaseRecord>,
}

impl ReleaseSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record keyed by its version, replacing any previous one
    pub fn insert(&mut self, record: ReleaseRecord) {
        self.releases.insert(record.version.clone(), record);
    }

    pub fn get(&self, version: &str) -> Option<&ReleaseRecord> {
        self.releases.get(version)
    }

    pub fn len(&self) -> usize {
        self.releases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }

    pub fn versions(&self) -> impl Iterator<Item = &str> {
        self.releases.keys().map(String::as_str)
    }

    /// Records ordered from the highest to the lowest semantic version
    ///
    /// Storage order is not meaningful, so readers that care about order go through here.
    pub fn sorted_descending(&self) -> Vec<&ReleaseRecord> {
        let mut parsed: Vec<_> = self
            .releases
            .values()
            .filter_map(|record| parse_version(&record.version).map(|v| (v, record)))
            .collect();
        sort_descending(&mut parsed);
        parsed.into_iter().map(|(_, record)| record).collect()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode a stored snapshot, rejecting entries whose key is not the
    /// canonical semantic version of the record it holds
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let snapshot: Self = serde_json::from_str(raw)?;

        for (key, record) in &snapshot.releases {
            if canonical_version(key).as_deref() != Some(key.as_str()) {
                return Err(serde::de::Error::custom(format!(
                    "snapshot key {key:?} is not a canonical semantic version"
                )));
            }
            if record.version != *key {
                return Err(serde::de::Error::custom(format!(
                    "snapshot key {key:?} holds record for version {:?}",
                    record.version
                )));
            }
        }

        Ok(snapshot)
    }
}

impl FromIterator<ReleaseRecord> for ReleaseSnapshot {
    fn from_iter<I: IntoIterator<Item = ReleaseRecord>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for record in iter {
            snapshot.insert(record);
        }
        snapshot
    }
}

/// Where the served snapshot came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Cache,
    Fresh,
    Stale,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Cache => "cache",
            Provenance::Fresh => "fresh",
            Provenance::Stale => "stale",
        }
    }
}

/// A snapshot together with its provenance and the worst error seen producing it
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRead {
    pub snapshot: ReleaseSnapshot,
    pub source: Provenance,
    pub error: Option<ClassifiedError>,
}

impl SnapshotRead {
    pub fn cached(snapshot: ReleaseSnapshot) -> Self {
        Self {
            snapshot,
            source: Provenance::Cache,
            error: None,
        }
    }

    pub fn fresh(snapshot: ReleaseSnapshot, error: Option<ClassifiedError>) -> Self {
        Self {
            snapshot,
            source: Provenance::Fresh,
            error,
        }
    }

    pub fn stale(snapshot: ReleaseSnapshot, error: ClassifiedError) -> Self {
        Self {
            snapshot,
            source: Provenance::Stale,
            error: Some(error),
        }
    }

    /// True when nothing can be served and an upstream failure explains why
    pub fn is_unavailable(&self) -> bool {
        self.snapshot.is_empty() && self.error.is_some()
    }
}
