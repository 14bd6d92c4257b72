use std::error::Error;
use std::sync::Arc;

/// An error encountered while renewing the access token
///
/// Every variant is terminal for the renewal attempt: the coordinator does
/// not retry, it terminates the session and reports the same error to the
/// caller and to every queued waiter. Shared sources are held behind [`Arc`]
/// so that one outcome can be fanned out to any number of waiters.
#[derive(Clone, Debug, thiserror::Error)]
pub enum RefreshError {
    /// No refresh token was available when renewal was attempted
    #[error("no refresh token is available to renew the session")]
    NoRefreshCredential,

    /// The renewal request could not be sent or the transport failed mid-flight
    #[error("error sending renewal request to the authority")]
    Transport(#[source] Arc<dyn Error + Send + Sync + 'static>),

    /// The authority answered with a non-success status
    #[error("authority rejected the renewal request (status {status})")]
    Rejected {
        /// The HTTP status code returned by the authority
        status: u16,
        /// The response body, captured for diagnostics
        body: String,
    },

    /// The authority answered with a success status but an undecodable body
    ///
    /// This includes a body that parses but lacks the mandatory
    /// `access_token` field.
    #[error("authority returned a malformed renewal response")]
    MalformedResponse(#[source] Arc<dyn Error + Send + Sync + 'static>),

    /// The in-flight renewal ended without reporting an outcome
    ///
    /// Happens when the renewal task is torn down, by a panic in the
    /// renewal source or by runtime shutdown, before it could produce a
    /// result. A panicked attempt settles its waiters with this error and
    /// terminates the session like any other renewal failure.
    #[error("renewal attempt ended without reporting an outcome")]
    Interrupted,
}

impl RefreshError {
    pub(crate) fn transport<E>(source: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self::Transport(Arc::new(source))
    }

    pub(crate) fn malformed<E>(source: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self::MalformedResponse(Arc::new(source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_reports_status_in_message() {
        let err = RefreshError::Rejected {
            status: 401,
            body: "{\"error\":\"invalid_grant\"}".into(),
        };
        assert_eq!(
            err.to_string(),
            "authority rejected the renewal request (status 401)"
        );
    }

    #[test]
    fn transport_preserves_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err = RefreshError::transport(io);
        assert!(err.source().is_some());
        let clone = err.clone();
        assert!(clone.source().is_some());
    }
}
