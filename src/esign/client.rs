//! REST client for the envelopes resource
//!
//! One attempt per call, bounded by the configured timeout. Failures are
//! classified into the gateway taxonomy; nothing is retried here.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::types::{
    EnvelopeSummary, EnvelopesInformation, ProviderError, RecipientViewRequest, StatusChangesQuery,
    StatusRecord, ViewUrl,
};
use crate::auth::SessionCredential;
use crate::envelope::EnvelopeDefinition;
use crate::types::{GatewayError, Result};

/// Provider error code for a view request naming an unknown recipient
pub const UNKNOWN_ENVELOPE_RECIPIENT: &str = "UNKNOWN_ENVELOPE_RECIPIENT";

/// Where the REST API lives and how long a call may take
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base path without trailing slash, e.g. https://demo.docusign.net/restapi
    pub base_path: String,
    pub account_id: String,
    pub request_timeout: Duration,
}

/// Envelope operations on the remote service (allows mocking in tests)
#[async_trait]
pub trait EnvelopesApi: Send + Sync {
    async fn create_envelope(
        &self,
        credential: &SessionCredential,
        account_id: &str,
        envelope: &EnvelopeDefinition,
    ) -> Result<EnvelopeSummary>;

    async fn create_recipient_view(
        &self,
        credential: &SessionCredential,
        account_id: &str,
        envelope_id: &str,
        request: &RecipientViewRequest,
    ) -> Result<ViewUrl>;

    async fn get_envelope(
        &self,
        credential: &SessionCredential,
        account_id: &str,
        envelope_id: &str,
    ) -> Result<StatusRecord>;

    async fn list_status_changes(
        &self,
        credential: &SessionCredential,
        account_id: &str,
        query: &StatusChangesQuery,
    ) -> Result<Vec<StatusRecord>>;
}

/// Map a non-success response onto the error taxonomy
pub fn classify_failure(status: u16, body: &[u8]) -> GatewayError {
    let provider: ProviderError = serde_json::from_slice(body).unwrap_or_default();
    let message = provider
        .message
        .clone()
        .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string());

    match provider.error_code.as_deref() {
        Some(UNKNOWN_ENVELOPE_RECIPIENT) => GatewayError::RecipientMismatch(message),
        _ if status == StatusCode::UNAUTHORIZED.as_u16() => {
            GatewayError::Auth(format!("Access token rejected: {}", message))
        }
        _ => GatewayError::Remote {
            status: Some(status),
            code: provider.error_code,
            message: if message.is_empty() {
                format!("HTTP {}", status)
            } else {
                message
            },
        },
    }
}

/// reqwest-backed implementation of [`EnvelopesApi`]
pub struct RestEnvelopesApi {
    base_path: String,
    http_client: reqwest::Client,
}

impl RestEnvelopesApi {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("envelope-gateway/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GatewayError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            base_path: config.base_path.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    fn envelopes_url(&self, account_id: &str) -> String {
        format!(
            "{}/v2.1/accounts/{}/envelopes",
            self.base_path,
            urlencoding::encode(account_id)
        )
    }

    fn envelope_url(&self, account_id: &str, envelope_id: &str) -> String {
        format!(
            "{}/{}",
            self.envelopes_url(account_id),
            urlencoding::encode(envelope_id)
        )
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        operation: &'static str,
    ) -> Result<T> {
        let response = request.send().await.map_err(|e| {
            warn!(operation, error = %e, "Remote call failed");
            GatewayError::from(e)
        })?;

        let status = response.status();
        let body = response.bytes().await.map_err(GatewayError::from)?;
        debug!(operation, status = %status, bytes = body.len(), "Remote call completed");

        if !status.is_success() {
            let err = classify_failure(status.as_u16(), &body);
            warn!(operation, status = %status, code = err.code(), error = %err, "Remote call rejected");
            return Err(err);
        }

        serde_json::from_slice(&body).map_err(|e| {
            GatewayError::remote(
                Some(status.as_u16()),
                format!("Unexpected {} response: {}", operation, e),
            )
        })
    }
}

#[async_trait]
impl EnvelopesApi for RestEnvelopesApi {
    async fn create_envelope(
        &self,
        credential: &SessionCredential,
        account_id: &str,
        envelope: &EnvelopeDefinition,
    ) -> Result<EnvelopeSummary> {
        let request = self
            .http_client
            .post(self.envelopes_url(account_id))
            .header(reqwest::header::AUTHORIZATION, credential.authorization_header())
            .json(envelope);
        self.execute(request, "create_envelope").await
    }

    async fn create_recipient_view(
        &self,
        credential: &SessionCredential,
        account_id: &str,
        envelope_id: &str,
        request: &RecipientViewRequest,
    ) -> Result<ViewUrl> {
        let url = format!("{}/views/recipient", self.envelope_url(account_id, envelope_id));
        let request = self
            .http_client
            .post(url)
            .header(reqwest::header::AUTHORIZATION, credential.authorization_header())
            .json(request);
        self.execute(request, "create_recipient_view").await
    }

    async fn get_envelope(
        &self,
        credential: &SessionCredential,
        account_id: &str,
        envelope_id: &str,
    ) -> Result<StatusRecord> {
        let request = self
            .http_client
            .get(self.envelope_url(account_id, envelope_id))
            .header(reqwest::header::AUTHORIZATION, credential.authorization_header());
        self.execute(request, "get_envelope").await
    }

    async fn list_status_changes(
        &self,
        credential: &SessionCredential,
        account_id: &str,
        query: &StatusChangesQuery,
    ) -> Result<Vec<StatusRecord>> {
        let query_string = serde_urlencoded::to_string(query.query_pairs())
            .map_err(|e| GatewayError::Internal(format!("Query encoding: {}", e)))?;
        let url = format!("{}?{}", self.envelopes_url(account_id), query_string);

        let request = self
            .http_client
            .get(url)
            .header(reqwest::header::AUTHORIZATION, credential.authorization_header());
        let info: EnvelopesInformation = self.execute(request, "list_status_changes").await?;
        Ok(info.envelopes)
    }
}
