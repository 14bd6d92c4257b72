//! Wire shapes for the HTTP renewal exchange

use crate::braids::{AccessTokenRef, RefreshTokenRef};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(super) struct RenewalRequest<'a> {
    pub refresh_token: &'a RefreshTokenRef,
}

#[derive(Debug, Deserialize)]
pub(super) struct RenewalResponse<'a> {
    #[serde(borrow)]
    pub access_token: &'a AccessTokenRef,
    #[serde(borrow, default)]
    pub refresh_token: Option<&'a RefreshTokenRef>,
}
