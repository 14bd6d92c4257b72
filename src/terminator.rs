//! Session teardown

use crate::store::CredentialStore;
use std::fmt;
use std::sync::Arc;

const DEFAULT_SIGN_IN_PATH: &str = "/login";

/// The host's navigation facility
///
/// Implemented by whatever shell hosts the session. A plain closure over the
/// path is enough:
///
/// ```
/// use tokenward::Navigate;
///
/// fn handoff(navigate: impl Navigate) {
///     navigate.redirect_to("/login");
/// }
///
/// handoff(|path: &str| println!("navigating to {}", path));
/// ```
pub trait Navigate: Send + Sync {
    /// Sends the user to `path`
    fn redirect_to(&self, path: &str);
}

impl<F> Navigate for F
where
    F: Fn(&str) + Send + Sync,
{
    fn redirect_to(&self, path: &str) {
        self(path)
    }
}

/// Tears a session down by clearing its credentials and redirecting to sign-in
///
/// Termination is the single funnel for every renewal failure as well as for
/// explicit sign-out, so it may run more than once in close succession. Every
/// step is idempotent; repeated invocation clears an already empty store and
/// redirects again.
pub struct SessionTerminator {
    store: Arc<CredentialStore>,
    navigator: Box<dyn Navigate>,
    sign_in_path: String,
}

impl SessionTerminator {
    /// Constructs a terminator that clears `store` and redirects via `navigator`
    pub fn new(store: Arc<CredentialStore>, navigator: impl Navigate + 'static) -> Self {
        Self {
            store,
            navigator: Box::new(navigator),
            sign_in_path: DEFAULT_SIGN_IN_PATH.to_owned(),
        }
    }

    /// Replaces the default `/login` sign-in route
    pub fn with_sign_in_path(mut self, path: impl Into<String>) -> Self {
        self.sign_in_path = path.into();
        self
    }

    /// Clears the stored credential pair, then redirects to the sign-in route
    pub async fn terminate(&self) {
        self.store.clear().await;
        tracing::info!(
            sign_in_path = %self.sign_in_path,
            "session terminated, redirecting to sign-in"
        );
        self.navigator.redirect_to(&self.sign_in_path);
    }
}

impl fmt::Debug for SessionTerminator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SessionTerminator")
            .field("sign_in_path", &self.sign_in_path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::braids::{AccessToken, RefreshToken};
    use crate::store::InMemoryStorage;
    use std::sync::Mutex;

    fn recording_navigator() -> (Arc<Mutex<Vec<String>>>, impl Navigate + 'static) {
        let redirects = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&redirects);
        let navigator = move |path: &str| sink.lock().unwrap().push(path.to_owned());
        (redirects, navigator)
    }

    #[tokio::test]
    async fn termination_clears_the_store_and_redirects() {
        let store = Arc::new(CredentialStore::new(InMemoryStorage::new()));
        store
            .set(
                &AccessToken::from_static("access-1"),
                &RefreshToken::from_static("refresh-1"),
            )
            .await;

        let (redirects, navigator) = recording_navigator();
        let terminator = SessionTerminator::new(Arc::clone(&store), navigator);

        terminator.terminate().await;

        assert_eq!(store.access_token().await, None);
        assert_eq!(store.refresh_token().await, None);
        assert_eq!(*redirects.lock().unwrap(), vec!["/login".to_owned()]);
    }

    #[tokio::test]
    async fn repeated_termination_is_harmless() {
        let store = Arc::new(CredentialStore::new(InMemoryStorage::new()));
        let (redirects, navigator) = recording_navigator();
        let terminator = SessionTerminator::new(store, navigator);

        terminator.terminate().await;
        terminator.terminate().await;

        assert_eq!(redirects.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn the_sign_in_route_is_configurable() {
        let store = Arc::new(CredentialStore::new(InMemoryStorage::new()));
        let (redirects, navigator) = recording_navigator();
        let terminator =
            SessionTerminator::new(store, navigator).with_sign_in_path("/auth/sign-in");

        terminator.terminate().await;

        assert_eq!(*redirects.lock().unwrap(), vec!["/auth/sign-in".to_owned()]);
    }
}
