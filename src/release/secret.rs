//! Memoized credential for the forced-refresh trigger
//!
//! The secret is read from the key/value store on first use and kept for the
//! life of the instance. Rotation happens out of band; `reset` drops the
//! memoized copy so the next check reads the store again.

use std::sync::Arc;

use subtle::ConstantTimeEq;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::release::cache::KeyValueStore;
use crate::release::error::CacheError;

pub struct RefreshSecret<S: KeyValueStore> {
    store: Arc<S>,
    key: String,
    cached: Mutex<Option<String>>,
}

impl<S: KeyValueStore> RefreshSecret<S> {
    pub fn new(store: Arc<S>, key: &str) -> Self {
        Self {
            store,
            key: key.to_string(),
            cached: Mutex::new(None),
        }
    }

    /// Returns the secret, loading it on first call
    ///
    /// A missing or empty entry is not memoized, so a secret provisioned
    /// later is picked up without a reset.
    pub async fn get(&self) -> Result<Option<String>, CacheError> {
        let mut cached = self.cached.lock().await;
        if let Some(secret) = cached.as_ref() {
            return Ok(Some(secret.clone()));
        }

        let loaded = self
            .store
            .get(&self.key)
            .await?
            .filter(|secret| !secret.is_empty());

        match &loaded {
            Some(secret) => {
                debug!("Loaded refresh secret from {}", self.key);
                *cached = Some(secret.clone());
            }
            None => warn!("No refresh secret provisioned under {}", self.key),
        }

        Ok(loaded)
    }

    /// Check a presented bearer credential against the secret
    pub async fn verify(&self, presented: &str) -> Result<bool, CacheError> {
        if presented.is_empty() {
            return Ok(false);
        }

        Ok(self
            .get()
            .await?
            .is_some_and(|secret| secret.as_bytes().ct_eq(presented.as_bytes()).into()))
    }

    /// Forget the memoized secret
    pub async fn reset(&self) {
        *self.cached.lock().await = None;
    }

    /// Store a new secret; it never expires
    pub async fn provision(&self, secret: &str) -> Result<(), CacheError> {
        self.store.put(&self.key, secret, None).await?;
        self.reset().await;
        info!("Provisioned refresh secret under {}", self.key);
        Ok(())
    }
}
