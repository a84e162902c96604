//! Session-scoped credential cache
//!
//! Each browser session owns one [`CredentialSlot`]. The cache hands out the
//! stored bearer token while it is still valid and asks the [`TokenIssuer`]
//! for a fresh one otherwise.
//!
//! Two requests racing on an empty slot may both issue a token. No lock is
//! held across the issuance call; the last write wins.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::jwt::{redact, IssuedToken, TokenIssuer};
use crate::types::{GatewayError, Result};

/// Bearer token plus the instant it stops being usable locally
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCredential {
    token: String,
    expires_at: DateTime<Utc>,
}

impl SessionCredential {
    pub fn new(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// A credential is valid iff `now < expires_at`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Value of the Authorization header
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredential")
            .field("token", &redact(&self.token))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// The mutable credential slot carried by a session
#[derive(Debug, Default)]
pub struct CredentialSlot {
    inner: RwLock<Option<SessionCredential>>,
}

impl CredentialSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn current(&self) -> Option<SessionCredential> {
        self.inner.read().await.clone()
    }

    pub async fn store(&self, credential: SessionCredential) {
        *self.inner.write().await = Some(credential);
    }

    pub async fn clear(&self) {
        *self.inner.write().await = None;
    }
}

/// How issued tokens are turned into cached credentials
#[derive(Debug, Clone)]
pub struct CredentialPolicy {
    /// Subtracted from the remote lifetime to absorb clock skew and latency
    pub safety_margin_seconds: u64,
}

impl Default for CredentialPolicy {
    fn default() -> Self {
        Self {
            safety_margin_seconds: 60,
        }
    }
}

impl CredentialPolicy {
    /// `expires_at = issued_at + (expires_in - margin)`
    ///
    /// A token whose lifetime does not exceed the margin would be expired
    /// before first use, so it is rejected.
    pub fn credential_from(
        &self,
        issued: IssuedToken,
        issued_at: DateTime<Utc>,
    ) -> Result<SessionCredential> {
        if issued.expires_in <= self.safety_margin_seconds {
            return Err(GatewayError::Auth(format!(
                "Token lifetime {}s does not exceed safety margin {}s",
                issued.expires_in, self.safety_margin_seconds
            )));
        }

        let usable = i64::try_from(issued.expires_in - self.safety_margin_seconds)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .ok_or_else(|| {
                GatewayError::Auth(format!(
                    "Token lifetime {}s is out of range",
                    issued.expires_in
                ))
            })?;
        let expires_at = issued_at.checked_add_signed(usable).ok_or_else(|| {
            GatewayError::Auth(format!(
                "Token lifetime {}s overflows the clock",
                issued.expires_in
            ))
        })?;

        Ok(SessionCredential::new(issued.access_token, expires_at))
    }
}

/// Decides reuse vs refresh of session credentials
#[derive(Clone)]
pub struct CredentialCache {
    issuer: Arc<dyn TokenIssuer>,
    policy: CredentialPolicy,
}

impl CredentialCache {
    pub fn new(issuer: Arc<dyn TokenIssuer>, policy: CredentialPolicy) -> Self {
        Self { issuer, policy }
    }

    /// Return a credential that is valid right now
    pub async fn get_valid_credential(&self, slot: &CredentialSlot) -> Result<SessionCredential> {
        self.get_valid_credential_at(slot, Utc::now()).await
    }

    /// Same as [`get_valid_credential`](Self::get_valid_credential) with an explicit clock
    pub async fn get_valid_credential_at(
        &self,
        slot: &CredentialSlot,
        now: DateTime<Utc>,
    ) -> Result<SessionCredential> {
        if let Some(credential) = slot.current().await {
            if credential.is_valid_at(now) {
                debug!(
                    token = %redact(credential.token()),
                    expires_at = %credential.expires_at(),
                    "Re-using access token"
                );
                return Ok(credential);
            }
            debug!(expires_at = %credential.expires_at(), "Cached access token expired");
        }

        info!("Generating a new access token");
        let issued = self.issuer.issue_token().await.map_err(|e| {
            warn!(error = %e, "Access token issuance failed");
            match e {
                GatewayError::Auth(_) | GatewayError::Config(_) => e,
                other => GatewayError::Auth(other.to_string()),
            }
        })?;

        let credential = self.policy.credential_from(issued, now)?;
        slot.store(credential.clone()).await;
        Ok(credential)
    }
}
