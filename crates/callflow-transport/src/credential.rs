//! Explicit, explicitly-scoped API credential.
//!
//! A credential is constructed for one organization and handed to each
//! client; there is no ambient token cache. Expiry is checked by the
//! caller before every request, so an expired credential fails fast
//! instead of producing a remote 401 mid-save.

use chrono::{DateTime, Utc};

use callflow_policy::TransportError;

/// Bearer credential scoped to one organization's policy administration.
#[derive(Debug, Clone)]
pub struct ApiCredential {
    token: String,
    pub organization_id: String,
    pub expires_at: DateTime<Utc>,
}

impl ApiCredential {
    pub fn new(
        token: impl Into<String>,
        organization_id: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            token: token.into(),
            organization_id: organization_id.into(),
            expires_at,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// The `Authorization` header value.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// Fail fast when the credential has lapsed.
    pub fn ensure_fresh(&self) -> Result<(), TransportError> {
        if self.is_expired(Utc::now()) {
            return Err(TransportError::CredentialExpired {
                expired_at: self.expires_at.to_rfc3339(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn expiry_boundary() {
        let now = Utc::now();
        let cred = ApiCredential::new("tok", "org-1", now + Duration::minutes(5));
        assert!(!cred.is_expired(now));
        assert!(cred.is_expired(now + Duration::minutes(5)));
        assert!(cred.is_expired(now + Duration::minutes(6)));
    }

    #[test]
    fn ensure_fresh_reports_expiry() {
        let cred = ApiCredential::new("tok", "org-1", Utc::now() - Duration::minutes(1));
        let err = cred.ensure_fresh().unwrap_err();
        assert!(matches!(err, TransportError::CredentialExpired { .. }));
    }

    #[test]
    fn bearer_header() {
        let cred = ApiCredential::new("sk-123", "org-1", Utc::now());
        assert_eq!(cred.bearer(), "Bearer sk-123");
    }
}
