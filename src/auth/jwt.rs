//! JWT-bearer grant for service-to-service access tokens
//!
//! The gateway signs a short-lived RS256 assertion naming the integration key
//! (issuer) and the impersonated user (subject), then exchanges it at the
//! authorization server's `/oauth/token` endpoint (RFC 7523).
//!
//! Security notes:
//! - The private key is read once at startup and zeroized on drop
//! - Assertions live for the configured lifetime (default 10 minutes)
//! - Access tokens are never logged in full

use std::fmt;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::types::{GatewayError, Result};

/// Grant type for the JWT-bearer exchange
pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Who the gateway claims to be when asking for a token
#[derive(Debug, Clone)]
pub struct ServiceIdentity {
    /// OAuth client id (JWT `iss`)
    pub integration_key: String,
    /// Impersonated user GUID (JWT `sub`)
    pub user_id: String,
    /// Authorization server host (JWT `aud`)
    pub oauth_base_path: String,
    /// Space separated scopes
    pub scope: String,
    /// Requested lifetime of the assertion and the resulting token
    pub lifetime_seconds: u64,
}

impl ServiceIdentity {
    /// Token endpoint on the authorization server
    pub fn token_url(&self) -> String {
        format!("https://{}/oauth/token", self.oauth_base_path)
    }
}

/// RSA private key in PEM form. Memory is cleared on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey {
    pem: Vec<u8>,
}

impl PrivateKey {
    /// Parse PEM bytes, rejecting anything that is not an RSA key
    pub fn from_pem(pem: Vec<u8>) -> Result<Self> {
        EncodingKey::from_rsa_pem(&pem)
            .map_err(|e| GatewayError::Config(format!("Invalid RSA private key: {}", e)))?;
        Ok(Self { pem })
    }

    /// Read the key file named in configuration
    pub fn load(path: &Path) -> Result<Self> {
        let pem = std::fs::read(path).map_err(|e| {
            GatewayError::Config(format!(
                "Cannot read private key {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_pem(pem)
    }

    fn encoding_key(&self) -> Result<EncodingKey> {
        EncodingKey::from_rsa_pem(&self.pem)
            .map_err(|e| GatewayError::Config(format!("Invalid RSA private key: {}", e)))
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// Claims of the service assertion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssertionClaims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub scope: String,
}

/// Sign a service assertion issued at `issued_at` (Unix seconds)
pub fn build_assertion(
    identity: &ServiceIdentity,
    key: &PrivateKey,
    issued_at: i64,
) -> Result<String> {
    let exp = i64::try_from(identity.lifetime_seconds)
        .ok()
        .and_then(|lifetime| issued_at.checked_add(lifetime))
        .ok_or_else(|| {
            GatewayError::Auth(format!(
                "Assertion lifetime {}s is out of range",
                identity.lifetime_seconds
            ))
        })?;

    let claims = AssertionClaims {
        iss: identity.integration_key.clone(),
        sub: identity.user_id.clone(),
        aud: identity.oauth_base_path.clone(),
        iat: issued_at,
        exp,
        scope: identity.scope.clone(),
    };

    encode(&Header::new(Algorithm::RS256), &claims, &key.encoding_key()?)
        .map_err(|e| GatewayError::Auth(format!("Failed to sign assertion: {}", e)))
}

/// Bearer token as returned by the authorization server
#[derive(Clone, Deserialize)]
pub struct IssuedToken {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Remote-side lifetime in seconds
    pub expires_in: u64,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("access_token", &redact(&self.access_token))
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// OAuth error body (RFC 6749 section 5.2)
#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Short, log-safe prefix of a secret
pub fn redact(secret: &str) -> String {
    let prefix: String = secret.chars().take(6).collect();
    format!("{prefix}…")
}

/// Source of fresh bearer tokens (allows mocking in tests)
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    /// Obtain a new token. Single attempt, no retry.
    async fn issue_token(&self) -> Result<IssuedToken>;
}

/// Issues tokens through the JWT-bearer grant
pub struct JwtGrantIssuer {
    identity: ServiceIdentity,
    key: PrivateKey,
    token_url: String,
    http_client: reqwest::Client,
}

impl JwtGrantIssuer {
    pub fn new(identity: ServiceIdentity, key: PrivateKey, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("envelope-gateway/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GatewayError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            token_url: identity.token_url(),
            identity,
            key,
            http_client,
        })
    }

    /// Send the grant to a different token endpoint
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }
}

#[async_trait]
impl TokenIssuer for JwtGrantIssuer {
    async fn issue_token(&self) -> Result<IssuedToken> {
        let assertion = build_assertion(&self.identity, &self.key, chrono::Utc::now().timestamp())?;
        let form = serde_urlencoded::to_string([
            ("grant_type", JWT_BEARER_GRANT),
            ("assertion", assertion.as_str()),
        ])
        .map_err(|e| GatewayError::Auth(format!("Failed to encode token request: {}", e)))?;

        let url = self.token_url.as_str();
        debug!(url = %url, sub = %self.identity.user_id, "Requesting access token");

        let response = self
            .http_client
            .post(url)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(form)
            .send()
            .await
            .map_err(|e| GatewayError::Auth(format!("Token request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| GatewayError::Auth(format!("Token response unreadable: {}", e)))?;

        if !status.is_success() {
            let reason = match serde_json::from_slice::<OAuthErrorBody>(&body) {
                Ok(err) => match err.error_description {
                    Some(description) => format!("{} ({})", err.error, description),
                    None => err.error,
                },
                Err(_) => String::from_utf8_lossy(&body).into_owned(),
            };
            warn!(status = %status, reason = %reason, "Token request rejected");
            return Err(GatewayError::Auth(format!("HTTP {}: {}", status, reason)));
        }

        let token: IssuedToken = serde_json::from_slice(&body)
            .map_err(|e| GatewayError::Auth(format!("Malformed token response: {}", e)))?;

        info!(
            expires_in = token.expires_in,
            token = %redact(&token.access_token),
            "Access token issued"
        );
        Ok(token)
    }
}
