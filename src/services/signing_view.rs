//! Embedded signing view requests
//!
//! Mints the one-time URL that opens the signing ceremony inside the app.
//! The URL is single-use and expires on the provider's schedule; it is not
//! tracked here.

use std::sync::Arc;

use tracing::{error, info};

use crate::auth::SessionCredential;
use crate::envelope::SignerIdentity;
use crate::esign::{EnvelopesApi, RecipientViewRequest, ViewUrl};
use crate::types::{GatewayError, Result};

/// An envelope accepted by the provider, with the signer it was built for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedEnvelope {
    pub envelope_id: String,
    pub signer: SignerIdentity,
}

/// Requests embedded signing views
#[derive(Clone)]
pub struct SigningViewRequester {
    api: Arc<dyn EnvelopesApi>,
}

impl SigningViewRequester {
    pub fn new(api: Arc<dyn EnvelopesApi>) -> Self {
        Self { api }
    }

    /// Ask the provider for a signing URL for `signer` on `envelope_id`
    ///
    /// The signer's client user id must be the one the envelope was built
    /// with; the provider answers a mismatch with an unknown-recipient error,
    /// surfaced as [`GatewayError::RecipientMismatch`].
    pub async fn request_signing_view(
        &self,
        credential: &SessionCredential,
        account_id: &str,
        envelope_id: &str,
        signer: &SignerIdentity,
        return_url: &str,
    ) -> Result<ViewUrl> {
        if envelope_id.trim().is_empty() {
            return Err(GatewayError::Validation("envelopeId is required".into()));
        }
        if signer.client_user_id.trim().is_empty() {
            return Err(GatewayError::Validation(
                "clientUserId is required for embedded signing".into(),
            ));
        }

        let request = RecipientViewRequest::embedded(signer, return_url);
        match self
            .api
            .create_recipient_view(credential, account_id, envelope_id, &request)
            .await
        {
            Ok(view) => {
                info!(envelope_id = %envelope_id, "Recipient view created");
                Ok(view)
            }
            Err(e @ GatewayError::RecipientMismatch(_)) => {
                error!(
                    envelope_id = %envelope_id,
                    client_user_id = %signer.client_user_id,
                    error = %e,
                    "Recipient mismatch on view request"
                );
                Err(e)
            }
            Err(e) => {
                error!(envelope_id = %envelope_id, error = %e, "Error on createRecipientView");
                Err(e)
            }
        }
    }

    /// Same as [`request_signing_view`](Self::request_signing_view), but
    /// rejects a signer that differs from the one the envelope was built for
    /// before any remote call.
    pub async fn request_for_submitted(
        &self,
        credential: &SessionCredential,
        account_id: &str,
        submitted: &SubmittedEnvelope,
        signer: &SignerIdentity,
        return_url: &str,
    ) -> Result<ViewUrl> {
        if submitted.signer.client_user_id != signer.client_user_id {
            error!(
                envelope_id = %submitted.envelope_id,
                expected = %submitted.signer.client_user_id,
                actual = %signer.client_user_id,
                "Recipient mismatch on view request"
            );
            return Err(GatewayError::RecipientMismatch(format!(
                "clientUserId {} does not match envelope {} recipient",
                signer.client_user_id, submitted.envelope_id
            )));
        }

        self.request_signing_view(
            credential,
            account_id,
            &submitted.envelope_id,
            signer,
            return_url,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::EnvelopeDefinition;
    use crate::esign::{EnvelopeSummary, StatusChangesQuery, StatusRecord};
    use crate::esign::client::UNKNOWN_ENVELOPE_RECIPIENT;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider double that knows one recipient per envelope
    struct MockViews {
        registered_client_user_id: String,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EnvelopesApi for MockViews {
        async fn create_envelope(
            &self,
            _credential: &SessionCredential,
            _account_id: &str,
            _envelope: &EnvelopeDefinition,
        ) -> Result<EnvelopeSummary> {
            unreachable!("not used")
        }

        async fn create_recipient_view(
            &self,
            _credential: &SessionCredential,
            _account_id: &str,
            envelope_id: &str,
            request: &RecipientViewRequest,
        ) -> Result<ViewUrl> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(request.authentication_method, "none");
            if request.client_user_id != self.registered_client_user_id {
                return Err(crate::esign::classify_failure(
                    400,
                    format!(r#"{{"errorCode":"{UNKNOWN_ENVELOPE_RECIPIENT}","message":"unknown recipient"}}"#)
                        .as_bytes(),
                ));
            }
            Ok(ViewUrl {
                url: format!("https://sign.example/{envelope_id}"),
            })
        }

        async fn get_envelope(
            &self,
            _credential: &SessionCredential,
            _account_id: &str,
            _envelope_id: &str,
        ) -> Result<StatusRecord> {
            unreachable!("not used")
        }

        async fn list_status_changes(
            &self,
            _credential: &SessionCredential,
            _account_id: &str,
            _query: &StatusChangesQuery,
        ) -> Result<Vec<StatusRecord>> {
            unreachable!("not used")
        }
    }

    fn signer(client_user_id: &str) -> SignerIdentity {
        SignerIdentity {
            name: "Jane Doe".to_string(),
            email: "jane@example.com".to_string(),
            client_user_id: client_user_id.to_string(),
        }
    }

    fn credential() -> SessionCredential {
        SessionCredential::new("tok", chrono::Utc::now() + chrono::Duration::minutes(5))
    }

    fn requester() -> (SigningViewRequester, Arc<MockViews>) {
        let api = Arc::new(MockViews {
            registered_client_user_id: "1001".to_string(),
            calls: AtomicUsize::new(0),
        });
        (SigningViewRequester::new(api.clone()), api)
    }

    #[tokio::test]
    async fn test_matching_recipient_gets_url() {
        let (requester, _) = requester();
        let view = requester
            .request_signing_view(&credential(), "acct", "E1", &signer("1001"), "http://app/success")
            .await
            .unwrap();
        assert_eq!(view.url, "https://sign.example/E1");
    }

    #[tokio::test]
    async fn test_remote_mismatch_is_recipient_error() {
        let (requester, _) = requester();
        let result = requester
            .request_signing_view(&credential(), "acct", "E1", &signer("2002"), "http://app/success")
            .await;
        assert!(matches!(result, Err(GatewayError::RecipientMismatch(_))));
    }

    #[tokio::test]
    async fn test_local_mismatch_skips_remote_call() {
        let (requester, api) = requester();
        let submitted = SubmittedEnvelope {
            envelope_id: "E1".to_string(),
            signer: signer("1001"),
        };

        let result = requester
            .request_for_submitted(&credential(), "acct", &submitted, &signer("2002"), "http://app/success")
            .await;

        assert!(matches!(result, Err(GatewayError::RecipientMismatch(_))));
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_client_user_id_is_validation_error() {
        let (requester, api) = requester();
        let result = requester
            .request_signing_view(&credential(), "acct", "E1", &signer(""), "http://app/success")
            .await;
        assert!(matches!(result, Err(GatewayError::Validation(_))));
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
    }
}
