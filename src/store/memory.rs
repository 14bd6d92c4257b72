//! An in-process storage backend

use super::AsyncCredentialStorage;
use aliri_clock::{Clock, DurationSecs, System, UnixTime};
use async_trait::async_trait;
use std::collections::HashMap;
use std::error;
use tokio::sync::RwLock;

/// Credential storage held entirely in process memory
///
/// Entries expire against the configured clock; an expired entry reads as
/// absent but is only dropped when overwritten or removed. Suited to hosts
/// where the session should not outlive the process.
#[derive(Debug, Default)]
pub struct InMemoryStorage<C = System> {
    entries: RwLock<HashMap<String, StoredEntry>>,
    clock: C,
}

#[derive(Debug)]
struct StoredEntry {
    value: String,
    expires_at: UnixTime,
}

impl InMemoryStorage {
    /// Constructs an empty store against the system clock
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C> InMemoryStorage<C> {
    /// Replaces the clock used to evaluate expiry
    pub fn with_clock<D>(self, clock: D) -> InMemoryStorage<D> {
        InMemoryStorage {
            entries: self.entries,
            clock,
        }
    }
}

#[async_trait]
impl<C> AsyncCredentialStorage for InMemoryStorage<C>
where
    C: Clock + Send + Sync,
{
    async fn store(
        &self,
        key: &str,
        value: &str,
        ttl: DurationSecs,
    ) -> Result<(), Box<dyn error::Error + Send + Sync + 'static>> {
        let expires_at = self.clock.now() + ttl;
        self.entries.write().await.insert(
            key.to_owned(),
            StoredEntry {
                value: value.to_owned(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn read(
        &self,
        key: &str,
    ) -> Result<Option<String>, Box<dyn error::Error + Send + Sync + 'static>> {
        let entries = self.entries.read().await;
        let value = entries
            .get(key)
            .filter(|entry| self.clock.now() < entry.expires_at)
            .map(|entry| entry.value.clone());
        Ok(value)
    }

    async fn remove(
        &self,
        key: &str,
    ) -> Result<(), Box<dyn error::Error + Send + Sync + 'static>> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}
