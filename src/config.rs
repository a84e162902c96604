//! Configuration for the envelope gateway
//!
//! CLI arguments and environment variable handling using clap. A `.env` file
//! is loaded by `main` before parsing, so every flag can also come from there.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::auth::{CredentialPolicy, ServiceIdentity};
use crate::envelope::{AnchorPlacement, AnchorUnits, EnvelopeTemplate};
use crate::esign::ApiConfig;

/// Longest assertion lifetime the authorization server accepts
pub const MAX_TOKEN_LIFETIME_SECONDS: u64 = 3600;

/// Envelope gateway - embedded signing over the DocuSign eSignature API
#[derive(Parser, Debug, Clone)]
#[command(name = "envelope-gateway")]
#[command(about = "Embedded signing gateway with session-scoped service credentials")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:3000")]
    pub listen: SocketAddr,

    /// Integration key (OAuth client id), used as the JWT issuer
    #[arg(long, env = "DOCU_INTEGRATION_KEY")]
    pub integration_key: String,

    /// GUID of the user the service impersonates, used as the JWT subject
    #[arg(long, env = "DOCU_USER_ID")]
    pub user_id: String,

    /// RSA private key (PEM) registered for the integration key
    #[arg(long, env = "DOCU_PRIVATE_KEY_PATH", default_value = "private.key")]
    pub private_key_path: PathBuf,

    /// Authorization server host (no scheme), e.g. account-d.docusign.com
    #[arg(long, env = "DOCU_OAUTH_BASE_PATH", default_value = "account-d.docusign.com")]
    pub oauth_base_path: String,

    /// REST API base path, e.g. https://demo.docusign.net/restapi
    #[arg(long, env = "DOCU_BASE_PATH")]
    pub base_path: String,

    /// API account id envelopes are created under
    #[arg(long, env = "DOCU_API_ACCOUNT_ID")]
    pub account_id: String,

    /// Client user id binding the signer to the embedded flow
    #[arg(long, env = "DOCU_CLIENT_USER_ID")]
    pub client_user_id: String,

    /// Document sent for signature (fixed asset, read at startup)
    #[arg(long, env = "DOCU_DOCUMENT_PATH", default_value = "document.pdf")]
    pub document_path: PathBuf,

    /// Where the signing ceremony redirects when finished
    #[arg(long, env = "DOCU_RETURN_URL", default_value = "http://localhost:3000/success")]
    pub return_url: String,

    /// OAuth scopes requested in the assertion
    #[arg(long, env = "DOCU_SCOPE", default_value = "signature impersonation")]
    pub scope: String,

    /// Requested access token lifetime in seconds
    #[arg(long, env = "TOKEN_LIFETIME_SECONDS", default_value = "600")]
    pub token_lifetime_seconds: u64,

    /// Seconds subtracted from the reported token lifetime before caching
    #[arg(long, env = "TOKEN_SAFETY_MARGIN_SECONDS", default_value = "60")]
    pub token_safety_margin_seconds: u64,

    /// Timeout for each remote call in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "30000")]
    pub request_timeout_ms: u64,

    /// Idle lifetime of a browser session in seconds
    #[arg(long, env = "SESSION_TTL_SECONDS", default_value = "3600")]
    pub session_ttl_seconds: u64,

    /// Text marker the signature field is anchored to
    #[arg(long, env = "ANCHOR_STRING", default_value = "/sn1/")]
    pub anchor_string: String,

    /// How many times the anchor is expected to appear in the document
    #[arg(long, env = "EXPECTED_ANCHOR_OCCURRENCES", default_value = "1")]
    pub expected_anchor_occurrences: usize,

    /// Subject line of the envelope notification
    #[arg(long, env = "EMAIL_SUBJECT", default_value = "Please sign this document")]
    pub email_subject: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        let required = [
            ("DOCU_INTEGRATION_KEY", &self.integration_key),
            ("DOCU_USER_ID", &self.user_id),
            ("DOCU_OAUTH_BASE_PATH", &self.oauth_base_path),
            ("DOCU_BASE_PATH", &self.base_path),
            ("DOCU_API_ACCOUNT_ID", &self.account_id),
            ("DOCU_CLIENT_USER_ID", &self.client_user_id),
            ("DOCU_RETURN_URL", &self.return_url),
            ("ANCHOR_STRING", &self.anchor_string),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(format!("{name} must not be empty"));
            }
        }

        if self.oauth_base_path.contains("://") {
            return Err("DOCU_OAUTH_BASE_PATH is a host name, drop the scheme".to_string());
        }

        if !self.base_path.starts_with("http://") && !self.base_path.starts_with("https://") {
            return Err("DOCU_BASE_PATH must be an http(s) URL".to_string());
        }

        if self.token_lifetime_seconds == 0 {
            return Err("TOKEN_LIFETIME_SECONDS must be greater than zero".to_string());
        }

        if self.token_lifetime_seconds > MAX_TOKEN_LIFETIME_SECONDS {
            return Err(format!(
                "TOKEN_LIFETIME_SECONDS must not exceed {MAX_TOKEN_LIFETIME_SECONDS}"
            ));
        }

        if self.token_safety_margin_seconds >= self.token_lifetime_seconds {
            return Err(
                "TOKEN_SAFETY_MARGIN_SECONDS must be less than TOKEN_LIFETIME_SECONDS".to_string(),
            );
        }

        if self.request_timeout_ms == 0 {
            return Err("REQUEST_TIMEOUT_MS must be greater than zero".to_string());
        }

        Ok(())
    }

    /// Identity presented to the authorization server
    pub fn service_identity(&self) -> ServiceIdentity {
        ServiceIdentity {
            integration_key: self.integration_key.clone(),
            user_id: self.user_id.clone(),
            oauth_base_path: self.oauth_base_path.clone(),
            scope: self.scope.clone(),
            lifetime_seconds: self.token_lifetime_seconds,
        }
    }

    /// Refresh policy for session credentials
    pub fn credential_policy(&self) -> CredentialPolicy {
        CredentialPolicy {
            safety_margin_seconds: self.token_safety_margin_seconds,
        }
    }

    /// REST API location and call timeout
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_path: self.base_path.trim_end_matches('/').to_string(),
            account_id: self.account_id.clone(),
            request_timeout: self.request_timeout(),
        }
    }

    /// Envelope shape shared by every submission
    pub fn envelope_template(&self) -> EnvelopeTemplate {
        EnvelopeTemplate {
            email_subject: self.email_subject.clone(),
            client_user_id: self.client_user_id.clone(),
            anchor: AnchorPlacement {
                anchor_string: self.anchor_string.clone(),
                x_offset: 20,
                y_offset: 10,
                units: AnchorUnits::Pixels,
            },
            expected_anchor_occurrences: self.expected_anchor_occurrences,
            ..EnvelopeTemplate::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_seconds)
    }
}
