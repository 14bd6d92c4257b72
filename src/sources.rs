//! Sources able to exchange a refresh token for a renewed pair

use crate::braids::{AccessToken, RefreshToken, RefreshTokenRef};
use crate::error::RefreshError;
use async_trait::async_trait;

#[cfg(feature = "http")]
#[cfg_attr(docsrs, doc(cfg(feature = "http")))]
pub mod http;

#[cfg(feature = "http")]
pub use self::http::HttpRenewalSource;

/// An asynchronous authority that renews a session from its refresh token
#[async_trait]
pub trait AsyncRenewalSource: Send + Sync {
    /// Exchanges `refresh_token` for a renewed pair
    ///
    /// Implementations make at most one attempt per call; retry policy, if
    /// any, belongs to the caller.
    async fn renew(&self, refresh_token: &RefreshTokenRef) -> Result<RenewedTokens, RefreshError>;
}

/// A successfully renewed set of tokens
#[derive(Debug)]
pub struct RenewedTokens {
    /// The replacement access token
    pub access_token: AccessToken,

    /// A rotated refresh token, when the authority issued one
    ///
    /// Authorities that do not rotate leave this unset, signaling that the
    /// refresh token used for the exchange remains valid.
    pub refresh_token: Option<RefreshToken>,
}
