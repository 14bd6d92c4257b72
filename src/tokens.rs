use aliri_clock::DurationSecs;
use std::time::Duration;

/// Fixed time-to-live policy for the stored credential pair
///
/// The access token is persisted with a short TTL, the refresh token with a
/// long one, and the proactive timer fires `renew_lead` before the access
/// token's expiry so that a fresh token is ready before any consumer needs it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TtlConfig {
    access_ttl: DurationSecs,
    refresh_ttl: DurationSecs,
    renew_lead: DurationSecs,
}

impl Default for TtlConfig {
    /// Default TTL policy
    ///
    /// The access token lives for 14 minutes, the refresh token for 30 days,
    /// and renewal runs 1 minute ahead of access expiry (13 minutes after
    /// storage).
    fn default() -> Self {
        Self {
            access_ttl: DurationSecs(14 * 60),
            refresh_ttl: DurationSecs(30 * 24 * 60 * 60),
            renew_lead: DurationSecs(60),
        }
    }
}

impl TtlConfig {
    /// Constructs a custom TTL policy
    ///
    /// `renew_lead` must be strictly shorter than `access_ttl`; the proactive
    /// timer fires `access_ttl - renew_lead` after the pair is stored.
    pub fn new(access_ttl: DurationSecs, refresh_ttl: DurationSecs, renew_lead: DurationSecs) -> Self {
        debug_assert!(
            renew_lead < access_ttl,
            "renewal lead must be shorter than the access token TTL"
        );
        Self {
            access_ttl,
            refresh_ttl,
            renew_lead,
        }
    }

    /// The TTL applied to the access token entry
    #[inline]
    pub fn access_ttl(&self) -> DurationSecs {
        self.access_ttl
    }

    /// The TTL applied to the refresh token entry
    #[inline]
    pub fn refresh_ttl(&self) -> DurationSecs {
        self.refresh_ttl
    }

    /// How far ahead of access expiry the proactive renewal runs
    #[inline]
    pub fn renew_lead(&self) -> DurationSecs {
        self.renew_lead
    }

    /// Delay between storing a fresh pair and the proactive renewal
    pub(crate) fn proactive_delay(&self) -> Duration {
        Duration::from_secs(self.access_ttl.0.saturating_sub(self.renew_lead.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_renews_at_thirteen_minutes() {
        let ttl = TtlConfig::default();
        assert_eq!(ttl.access_ttl(), DurationSecs(840));
        assert_eq!(ttl.refresh_ttl(), DurationSecs(2_592_000));
        assert_eq!(ttl.proactive_delay(), Duration::from_secs(13 * 60));
    }

    #[test]
    fn custom_policy_uses_its_own_lead() {
        let ttl = TtlConfig::new(DurationSecs(120), DurationSecs(3600), DurationSecs(20));
        assert_eq!(ttl.proactive_delay(), Duration::from_secs(100));
    }
}
