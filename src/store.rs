//! Persistence for the session's credential pair

use crate::braids::{AccessToken, AccessTokenRef, RefreshToken, RefreshTokenRef};
use crate::tokens::TtlConfig;
use aliri_clock::DurationSecs;
use async_trait::async_trait;
use std::{error, fmt};

#[cfg(feature = "file")]
#[cfg_attr(docsrs, doc(cfg(feature = "file")))]
pub mod file;
pub mod memory;

#[cfg(feature = "file")]
pub use self::file::FileStorage;
pub use self::memory::InMemoryStorage;

const ACCESS_TOKEN_KEY: &str = "access_token";
const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// An asynchronous key-value backend with per-entry expiry
///
/// The backend owns expiry enforcement: a read past an entry's TTL must
/// report the entry as absent. Implementations are shared across tasks and
/// therefore take `&self`.
#[async_trait]
pub trait AsyncCredentialStorage: Send + Sync {
    /// Persists `value` under `key`, expiring `ttl` from now
    async fn store(
        &self,
        key: &str,
        value: &str,
        ttl: DurationSecs,
    ) -> Result<(), Box<dyn error::Error + Send + Sync + 'static>>;

    /// Reads the value under `key`, or `None` if absent or expired
    async fn read(
        &self,
        key: &str,
    ) -> Result<Option<String>, Box<dyn error::Error + Send + Sync + 'static>>;

    /// Removes the entry under `key`, if any
    async fn remove(
        &self,
        key: &str,
    ) -> Result<(), Box<dyn error::Error + Send + Sync + 'static>>;
}

/// Durable storage for the session's access and refresh tokens
///
/// Exactly one pair is held. Both entries are written with the fixed TTL
/// policy from [`TtlConfig`]: short for the access token, long for the
/// refresh token. The store does not validate expiry itself; it trusts the
/// backend's own enforcement.
///
/// Backend faults are logged and absorbed: an entry that cannot be read is
/// reported as absent, and a failed write leaves the previous entry to age
/// out on its own.
pub struct CredentialStore {
    storage: Box<dyn AsyncCredentialStorage>,
    ttl: TtlConfig,
}

impl CredentialStore {
    /// Constructs a store over the given backend with the default TTL policy
    pub fn new(storage: impl AsyncCredentialStorage + 'static) -> Self {
        Self {
            storage: Box::new(storage),
            ttl: TtlConfig::default(),
        }
    }

    /// Replaces the TTL policy
    pub fn with_ttl_config(mut self, ttl: TtlConfig) -> Self {
        self.ttl = ttl;
        self
    }

    pub(crate) fn ttl_config(&self) -> TtlConfig {
        self.ttl
    }

    /// Persists both tokens under the fixed TTL policy
    ///
    /// Persistence only: scheduling of the proactive renewal timer belongs
    /// to [`RefreshCoordinator`](crate::RefreshCoordinator), so a pair
    /// written directly through the store is not renewed on its own.
    pub async fn set(&self, access: &AccessTokenRef, refresh: &RefreshTokenRef) {
        if let Err(error) = self
            .storage
            .store(ACCESS_TOKEN_KEY, access.as_str(), self.ttl.access_ttl())
            .await
        {
            tracing::warn!(
                error = (&*error as &dyn error::Error),
                "unable to persist access token"
            );
        }
        if let Err(error) = self
            .storage
            .store(REFRESH_TOKEN_KEY, refresh.as_str(), self.ttl.refresh_ttl())
            .await
        {
            tracing::warn!(
                error = (&*error as &dyn error::Error),
                "unable to persist refresh token"
            );
        }
    }

    /// The stored access token, unless absent or expired
    pub async fn access_token(&self) -> Option<AccessToken> {
        self.read_entry(ACCESS_TOKEN_KEY).await.map(AccessToken::from)
    }

    /// The stored refresh token, unless absent or expired
    pub async fn refresh_token(&self) -> Option<RefreshToken> {
        self.read_entry(REFRESH_TOKEN_KEY).await.map(RefreshToken::from)
    }

    async fn read_entry(&self, key: &str) -> Option<String> {
        match self.storage.read(key).await {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(
                    key = %key,
                    error = (&*error as &dyn error::Error),
                    "unable to read credential entry, treating it as absent"
                );
                None
            }
        }
    }

    /// Removes both tokens; clearing an empty store is a no-op
    ///
    /// Cancelling the proactive renewal timer likewise belongs to
    /// [`RefreshCoordinator`](crate::RefreshCoordinator); clear through its
    /// `terminate` when a timer may be pending.
    pub async fn clear(&self) {
        self.remove_entry(ACCESS_TOKEN_KEY).await;
        self.remove_entry(REFRESH_TOKEN_KEY).await;
    }

    async fn remove_entry(&self, key: &str) {
        if let Err(error) = self.storage.remove(key).await {
            tracing::warn!(
                key = %key,
                error = (&*error as &dyn error::Error),
                "unable to remove credential entry"
            );
        }
    }
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::SharedClock;

    struct BrokenStorage;

    #[async_trait]
    impl AsyncCredentialStorage for BrokenStorage {
        async fn store(
            &self,
            _key: &str,
            _value: &str,
            _ttl: DurationSecs,
        ) -> Result<(), Box<dyn error::Error + Send + Sync + 'static>> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "backend down").into())
        }

        async fn read(
            &self,
            _key: &str,
        ) -> Result<Option<String>, Box<dyn error::Error + Send + Sync + 'static>> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "backend down").into())
        }

        async fn remove(
            &self,
            _key: &str,
        ) -> Result<(), Box<dyn error::Error + Send + Sync + 'static>> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "backend down").into())
        }
    }

    fn pair() -> (AccessToken, RefreshToken) {
        (
            AccessToken::from_static("access-1"),
            RefreshToken::from_static("refresh-1"),
        )
    }

    #[tokio::test]
    async fn set_then_read_returns_both_tokens() {
        let store = CredentialStore::new(InMemoryStorage::new());
        let (access, refresh) = pair();

        store.set(&access, &refresh).await;

        assert_eq!(store.access_token().await, Some(access));
        assert_eq!(store.refresh_token().await, Some(refresh));
    }

    #[tokio::test]
    async fn access_token_expires_before_refresh_token() {
        let clock = SharedClock::at(1_700_000_000);
        let store = CredentialStore::new(InMemoryStorage::new().with_clock(clock.clone()));
        let (access, refresh) = pair();

        store.set(&access, &refresh).await;
        clock.advance(15 * 60);

        assert_eq!(store.access_token().await, None);
        assert_eq!(store.refresh_token().await, Some(refresh));
    }

    #[tokio::test]
    async fn clearing_an_empty_store_is_a_no_op() {
        let store = CredentialStore::new(InMemoryStorage::new());

        store.clear().await;
        store.clear().await;

        assert_eq!(store.access_token().await, None);
        assert_eq!(store.refresh_token().await, None);
    }

    #[tokio::test]
    async fn backend_faults_read_as_absent() {
        let store = CredentialStore::new(BrokenStorage);
        let (access, refresh) = pair();

        store.set(&access, &refresh).await;
        store.clear().await;

        assert_eq!(store.access_token().await, None);
        assert_eq!(store.refresh_token().await, None);
    }
}
