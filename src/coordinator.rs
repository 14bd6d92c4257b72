//! Single-flight coordination of session renewal

use crate::braids::{AccessToken, AccessTokenRef, RefreshToken, RefreshTokenRef};
use crate::error::RefreshError;
use crate::sources::AsyncRenewalSource;
use crate::store::CredentialStore;
use crate::terminator::SessionTerminator;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;

type RenewalOutcome = Result<AccessToken, RefreshError>;
type Waiter = oneshot::Sender<RenewalOutcome>;

/// Coordinates every caller's access to the session's token pair
///
/// The coordinator is the sole gate in front of the [`CredentialStore`]: it
/// hands out the stored access token while it remains fresh, renews it
/// through the configured [`AsyncRenewalSource`] when it is not, and tears
/// the session down through its [`SessionTerminator`] when renewal cannot
/// succeed.
///
/// At most one renewal is ever in flight. Callers that request a token while
/// a renewal is running are queued and settled with that renewal's outcome,
/// in arrival order, so a burst of requests against an expired token costs a
/// single exchange with the authority.
///
/// Renewal is also scheduled proactively: whenever a fresh pair is stored, a
/// timer is armed to renew shortly before the access token's expiry, keeping
/// the pair fresh even while no caller is asking for it. The timer holds only
/// a weak handle, so dropping the last `RefreshCoordinator` clone disarms it.
///
/// Handles are cheap to clone and share one state.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<CredentialStore>,
    source: Box<dyn AsyncRenewalSource>,
    terminator: SessionTerminator,
    state: Mutex<CoordinatorState>,
}

struct CoordinatorState {
    phase: RefreshPhase,
    epoch: u64,
    timer: Option<JoinHandle<()>>,
}

enum RefreshPhase {
    Idle,
    Refreshing { waiters: Vec<Waiter> },
}

impl RefreshCoordinator {
    /// Constructs a coordinator over the given store, source, and terminator
    ///
    /// The terminator should share the coordinator's store so that
    /// termination clears the same credentials the coordinator manages.
    pub fn new(
        store: Arc<CredentialStore>,
        source: impl AsyncRenewalSource + 'static,
        terminator: SessionTerminator,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                source: Box::new(source),
                terminator,
                state: Mutex::new(CoordinatorState {
                    phase: RefreshPhase::Idle,
                    epoch: 0,
                    timer: None,
                }),
            }),
        }
    }

    /// Seeds the store with a freshly issued pair and arms the proactive timer
    ///
    /// Called once after sign-in, and again whenever the host establishes a
    /// new session. A renewal still in flight for the previous session keeps
    /// its waiters, but its outcome can no longer touch the store, and its
    /// failure can no longer tear the new session down.
    pub async fn initialize(&self, access: AccessToken, refresh: RefreshToken) {
        let mut state = self.inner.state.lock().await;
        state.epoch += 1;
        self.inner.store.set(&access, &refresh).await;
        self.arm_timer(&mut state);
        tracing::debug!(epoch = state.epoch, "session credentials initialized");
    }

    /// Produces an access token that was fresh at the time of the call
    ///
    /// While the stored token is fresh it is returned as-is. Once it has
    /// expired, the first caller starts a renewal through the authority and
    /// every caller that arrives in the meantime waits for that same renewal;
    /// all of them settle with its outcome in arrival order. The renewal
    /// itself runs in its own task, so dropping a caller's future abandons
    /// only that caller's interest, never the shared renewal.
    ///
    /// A renewal failure is final: the session is terminated and the error is
    /// delivered to every waiting caller. No retry is attempted.
    pub async fn ensure_valid_access(&self) -> Result<AccessToken, RefreshError> {
        enum Action {
            Fresh(AccessToken),
            Wait(oneshot::Receiver<RenewalOutcome>),
        }

        let action = {
            let mut state = self.inner.state.lock().await;
            match &mut state.phase {
                RefreshPhase::Refreshing { waiters } => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push(tx);
                    tracing::trace!("renewal already in flight, joining its outcome");
                    Action::Wait(rx)
                }
                RefreshPhase::Idle => {
                    if let Some(access) = self.inner.store.access_token().await {
                        Action::Fresh(access)
                    } else {
                        let (tx, rx) = oneshot::channel();
                        state.phase = RefreshPhase::Refreshing { waiters: vec![tx] };
                        self.spawn_renewal(state.epoch);
                        Action::Wait(rx)
                    }
                }
            }
        };

        match action {
            Action::Fresh(access) => Ok(access),
            Action::Wait(rx) => match rx.await {
                Ok(outcome) => outcome,
                Err(_) => Err(RefreshError::Interrupted),
            },
        }
    }

    /// Tears the session down on the host's behalf
    ///
    /// Cancels any pending proactive renewal, clears the stored pair, and
    /// redirects to the sign-in route. Safe to call repeatedly. A renewal
    /// already in flight is not aborted; its waiters still receive its
    /// outcome, but its result is discarded rather than stored, and its
    /// failure does not redirect again.
    pub async fn terminate(&self) {
        self.terminate_session().await;
    }

    /// Hands the renewal to its own task so that no caller can cancel it
    fn spawn_renewal(&self, epoch: u64) {
        let coordinator = self.clone();
        tokio::spawn(async move {
            // every interested caller holds a waiter; the outcome is theirs
            let _ = coordinator.run_renewal(epoch).await;
        });
    }

    /// Supervises one renewal attempt, then settles the queue
    ///
    /// The attempt itself runs in a child task: however it ends, a panic in
    /// the source included, every waiter hears an outcome and the phase
    /// returns to idle.
    async fn run_renewal(&self, epoch: u64) -> RenewalOutcome {
        let attempt = {
            let coordinator = self.clone();
            tokio::spawn(async move { coordinator.renew_once(epoch).await })
        };

        let outcome = match attempt.await {
            Ok(outcome) => outcome,
            Err(error) => {
                tracing::error!(
                    error = (&error as &dyn std::error::Error),
                    "renewal attempt was torn down before reporting, terminating session"
                );
                self.fail_session(epoch).await;
                Err(RefreshError::Interrupted)
            }
        };

        let waiters = {
            let mut state = self.inner.state.lock().await;
            match std::mem::replace(&mut state.phase, RefreshPhase::Idle) {
                RefreshPhase::Refreshing { waiters } => waiters,
                RefreshPhase::Idle => Vec::new(),
            }
        };

        for waiter in waiters {
            // a waiter that gave up and dropped its receiver is fine to skip
            let _ = waiter.send(outcome.clone());
        }

        outcome
    }

    /// One pass of the renewal protocol, with no retry
    async fn renew_once(&self, epoch: u64) -> RenewalOutcome {
        let refresh_token = match self.inner.store.refresh_token().await {
            Some(token) => token,
            None => {
                tracing::warn!("no refresh token available, terminating session");
                self.fail_session(epoch).await;
                return Err(RefreshError::NoRefreshCredential);
            }
        };

        tracing::debug!("requesting renewed tokens");
        match self.inner.source.renew(&refresh_token).await {
            Ok(renewed) => {
                let rotated = renewed.refresh_token.is_some();
                let retained = renewed.refresh_token.unwrap_or(refresh_token);
                let access = renewed.access_token;
                self.store_renewed(epoch, &access, &retained).await;
                tracing::info!(refresh_token_rotated = rotated, "access token renewed");
                Ok(access)
            }
            Err(error) => {
                tracing::warn!(
                    error = (&error as &dyn std::error::Error),
                    "renewal failed, terminating session"
                );
                self.fail_session(epoch).await;
                Err(error)
            }
        }
    }

    /// Stores a renewal result, unless the session changed underneath it
    async fn store_renewed(&self, epoch: u64, access: &AccessTokenRef, retained: &RefreshTokenRef) {
        let mut state = self.inner.state.lock().await;
        if state.epoch == epoch {
            self.inner.store.set(access, retained).await;
            self.arm_timer(&mut state);
        } else {
            tracing::debug!("session superseded during renewal, discarding its result");
        }
    }

    async fn terminate_session(&self) {
        let mut state = self.inner.state.lock().await;
        self.terminate_locked(&mut state).await;
    }

    /// Terminates on behalf of a failed renewal, unless the session changed
    /// underneath the attempt
    async fn fail_session(&self, epoch: u64) {
        let mut state = self.inner.state.lock().await;
        if state.epoch == epoch {
            self.terminate_locked(&mut state).await;
        } else {
            tracing::debug!("session superseded during renewal, leaving the new session in place");
        }
    }

    /// Supersedes the session and tears it down under the state lock, so a
    /// fresh seed cannot interleave with the clear
    async fn terminate_locked(&self, state: &mut CoordinatorState) {
        state.epoch += 1;
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        self.inner.terminator.terminate().await;
    }

    fn arm_timer(&self, state: &mut CoordinatorState) {
        if let Some(previous) = state.timer.take() {
            previous.abort();
        }
        let delay = self.inner.store.ttl_config().proactive_delay();
        let weak = Arc::downgrade(&self.inner);
        state.timer = Some(tokio::spawn(proactive_timer(weak, delay)));
    }

    /// Claims ownership of a renewal if none is in flight
    async fn begin_renewal(&self) -> Option<u64> {
        let mut state = self.inner.state.lock().await;
        match state.phase {
            RefreshPhase::Idle => {
                state.phase = RefreshPhase::Refreshing {
                    waiters: Vec::new(),
                };
                Some(state.epoch)
            }
            RefreshPhase::Refreshing { .. } => None,
        }
    }
}

/// Waits out the proactive delay, then renews on the coordinator's behalf
///
/// The renewal itself runs in a detached task, so rearming the timer can
/// never abort a renewal that has already begun.
async fn proactive_timer(inner: Weak<Inner>, delay: Duration) {
    tokio::time::sleep(delay).await;
    let inner = match inner.upgrade() {
        Some(inner) => inner,
        None => return,
    };

    tokio::spawn(async move {
        let coordinator = RefreshCoordinator { inner };
        tracing::debug!("proactive renewal timer fired");
        match coordinator.begin_renewal().await {
            Some(epoch) => {
                if let Err(error) = coordinator.run_renewal(epoch).await {
                    tracing::warn!(
                        error = (&error as &dyn std::error::Error),
                        "proactive renewal failed, session terminated"
                    );
                }
            }
            None => {
                tracing::trace!("renewal already in flight, leaving it to its owner");
            }
        }
    });
}

impl fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("store", &self.inner.store)
            .field("terminator", &self.inner.terminator)
            .finish()
    }
}
