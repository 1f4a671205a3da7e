//! Store test utilities

use std::sync::Arc;

use tempfile::TempDir;

use release_gateway::config::CACHE_KEY;
use release_gateway::release::cache::{KeyValueStore, SqliteStore};
use release_gateway::release::types::{ReleaseRecord, ReleaseSnapshot};

/// Create a SQLite store in a fresh temp directory
pub fn create_test_store() -> (TempDir, Arc<SqliteStore>) {
    let temp_dir = TempDir::new().unwrap();
    let store = SqliteStore::open(&temp_dir.path().join("test.db")).unwrap();
    (temp_dir, Arc::new(store))
}

/// Write a snapshot holding `versions` under the default cache key
pub async fn seed_snapshot(store: &SqliteStore, versions: &[&str]) {
    let snapshot: ReleaseSnapshot = versions
        .iter()
        .map(|v| ReleaseRecord {
            version: v.to_string(),
            released_at: None,
            minimum_runtime_version: "27.0.0".to_string(),
            download_url: format!("https://dl.example.com/{v}"),
            size_bytes: 512,
            is_prerelease: false,
            upstream_id: 1,
            changelog: format!("cached notes for {v}"),
        })
        .collect();

    store
        .put(CACHE_KEY, &snapshot.to_json().unwrap(), None)
        .await
        .unwrap();
}
