//! Keeps a session's token pair fresh behind a single gate
//!
//! A session is a pair of credentials: a short-lived access token presented
//! on every call to a protected API, and a long-lived refresh token used
//! solely to obtain the next access token. The [`RefreshCoordinator`] owns
//! that pair. It hands the access token out while it is fresh, renews it
//! through a pluggable authority shortly before it expires, and collapses
//! concurrent demand so that at most one renewal is ever in flight; callers
//! that arrive mid-renewal are queued and settled with the shared outcome in
//! arrival order.
//!
//! Renewal is deliberately fail-fast. Any failure, from a missing refresh
//! token to a rejection by the authority, terminates the session: stored
//! credentials are cleared and the host is redirected to its sign-in route.
//! There are no retries; recovery is a fresh sign-in.
//!
//! ```
//! use std::sync::Arc;
//! use tokenward::sources::HttpRenewalSource;
//! use tokenward::store::FileStorage;
//! use tokenward::{CredentialStore, RefreshCoordinator, SessionTerminator};
//!
//! # async fn wire_up() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(CredentialStore::new(FileStorage::new(".session-tokens.json")));
//!
//! let source = HttpRenewalSource::new(
//!     reqwest::Client::new(),
//!     reqwest::Url::parse("https://issuer.example.com/session/renew")?,
//! );
//!
//! let terminator = SessionTerminator::new(Arc::clone(&store), |path: &str| {
//!     tracing::info!(path, "host asked to navigate to sign-in");
//! });
//!
//! let coordinator = RefreshCoordinator::new(store, source, terminator);
//!
//! # let access_token = tokenward::AccessToken::from_static("issued-at-sign-in");
//! # let refresh_token = tokenward::RefreshToken::from_static("issued-at-sign-in");
//! coordinator.initialize(access_token, refresh_token).await;
//!
//! let token = coordinator.ensure_valid_access().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! * `file` (default): [`store::FileStorage`], persistence as a JSON document on disk
//! * `http` (default): [`sources::HttpRenewalSource`], renewal against an HTTP authority

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

mod braids;
mod coordinator;
mod error;
pub mod sources;
pub mod store;
mod terminator;
#[cfg(test)]
mod test_support;
mod tokens;

pub use braids::*;
pub use coordinator::RefreshCoordinator;
pub use error::RefreshError;
pub use store::CredentialStore;
pub use terminator::{Navigate, SessionTerminator};
pub use tokens::TtlConfig;
