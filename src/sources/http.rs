//! A renewal source backed by an HTTP authority

use super::{AsyncRenewalSource, RenewedTokens};
use crate::braids::RefreshTokenRef;
use crate::error::RefreshError;
use async_trait::async_trait;

mod dto;

/// Renews the session by posting the refresh token to an HTTP endpoint
///
/// The exchange is a JSON `POST` of the form `{"refresh_token": …}`. A
/// success response carries `{"access_token": …}` and, if the authority
/// rotates, a `refresh_token` alongside it. Non-success statuses are
/// reported as rejections without retry.
#[derive(Clone, Debug)]
pub struct HttpRenewalSource {
    client: reqwest::Client,
    renew_url: reqwest::Url,
}

impl HttpRenewalSource {
    /// Constructs a source that renews against `renew_url`
    pub fn new(client: reqwest::Client, renew_url: reqwest::Url) -> Self {
        Self { client, renew_url }
    }
}

#[async_trait]
impl AsyncRenewalSource for HttpRenewalSource {
    #[tracing::instrument(
        name = "renew_session",
        skip(self, refresh_token),
        fields(renew_url = %self.renew_url)
    )]
    async fn renew(&self, refresh_token: &RefreshTokenRef) -> Result<RenewedTokens, RefreshError> {
        tracing::trace!("requesting renewed tokens from authority");

        let resp = self
            .client
            .post(self.renew_url.clone())
            .json(&dto::RenewalRequest { refresh_token })
            .send()
            .await
            .map_err(RefreshError::transport)?;

        let status = resp.status();
        tracing::debug!(
            response.status = status.as_u16(),
            "received renewal response from authority"
        );

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RefreshError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.bytes().await.map_err(RefreshError::transport)?;
        let resp: dto::RenewalResponse = serde_json::from_slice(&body).map_err(RefreshError::malformed)?;

        tracing::debug!(
            refresh_token_rotated = resp.refresh_token.is_some(),
            "authority issued renewed tokens"
        );

        Ok(RenewedTokens {
            access_token: (*resp.access_token).to_owned(),
            refresh_token: resp.refresh_token.map(|token| (*token).to_owned()),
        })
    }
}
