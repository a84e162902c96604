//! The authenticated envelope workflow
//!
//! Entry points used by the HTTP layer. Each operation takes the caller's
//! [`SessionContext`], obtains a credential through the cache, and drives the
//! builder, view requester or status gateway. No state outlives a call apart
//! from the session's credential slot.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use super::signing_view::{SigningViewRequester, SubmittedEnvelope};
use super::status::{parse_status_filter, status_changes_query, StatusGateway};
use crate::auth::{CredentialCache, SessionCredential};
use crate::envelope::{AnchorCheck, DocumentAsset, EnvelopeTemplate};
use crate::esign::{EnvelopesApi, StatusRecord};
use crate::session::SessionContext;
use crate::types::{GatewayError, Result};

/// Response of a successful submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub envelope_id: String,
    pub redirect_url: String,
}

/// Response of a status-change listing
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangesResponse {
    pub envelopes: Vec<StatusRecord>,
    pub result_set_size: usize,
}

/// Acknowledgement of the signing ceremony redirect
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuccessAck {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
}

/// Static settings of the workflow
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    pub account_id: String,
    pub return_url: String,
}

/// Wires credential cache, envelope builder and remote gateways together
pub struct EnvelopeWorkflow {
    credentials: CredentialCache,
    api: Arc<dyn EnvelopesApi>,
    views: SigningViewRequester,
    status: StatusGateway,
    template: EnvelopeTemplate,
    document: DocumentAsset,
    config: WorkflowConfig,
}

impl EnvelopeWorkflow {
    pub fn new(
        credentials: CredentialCache,
        api: Arc<dyn EnvelopesApi>,
        template: EnvelopeTemplate,
        document: DocumentAsset,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            credentials,
            views: SigningViewRequester::new(Arc::clone(&api)),
            status: StatusGateway::new(Arc::clone(&api)),
            api,
            template,
            document,
            config,
        }
    }

    pub fn template(&self) -> &EnvelopeTemplate {
        &self.template
    }

    pub fn document(&self) -> &DocumentAsset {
        &self.document
    }

    /// Anchor occurrences in the loaded document against the template
    pub fn anchor_check(&self) -> AnchorCheck {
        self.template.check_anchor(self.document.bytes())
    }

    /// Build and send an envelope for `name <email>`, then mint its signing URL
    pub async fn submit_envelope(
        &self,
        ctx: &SessionContext,
        name: &str,
        email: &str,
    ) -> Result<SubmitResponse> {
        let (name, email) = (name.trim(), email.trim());
        if name.is_empty() || email.is_empty() {
            return Err(GatewayError::Validation("name and email are required".into()));
        }
        if !email.contains('@') {
            return Err(GatewayError::Validation(format!("{email:?} is not an email address")));
        }

        let signer = self.template.signer(name, email);
        let envelope = self.template.build(&signer, self.document.bytes());

        let anchor = self.anchor_check();
        if !anchor.is_satisfied() {
            warn!(
                anchor = %self.template.anchor.anchor_string,
                expected = anchor.expected,
                found = anchor.found,
                "Submitting envelope with unexpected anchor count"
            );
        }

        let credential = self.credential(ctx).await?;

        let summary = match self
            .api
            .create_envelope(&credential, &self.config.account_id, &envelope)
            .await
        {
            Ok(summary) => summary,
            Err(e) => {
                error!(session_id = %ctx.session_id(), code = e.code(), error = %e, "Error on createEnvelope");
                return Err(self.settle(ctx, e).await);
            }
        };
        info!(
            session_id = %ctx.session_id(),
            envelope_id = %summary.envelope_id,
            "Envelope created"
        );

        let submitted = SubmittedEnvelope {
            envelope_id: summary.envelope_id,
            signer,
        };
        let view = match self
            .views
            .request_for_submitted(
                &credential,
                &self.config.account_id,
                &submitted,
                &submitted.signer,
                &self.config.return_url,
            )
            .await
        {
            Ok(view) => view,
            Err(e) => return Err(self.settle(ctx, e).await),
        };

        Ok(SubmitResponse {
            envelope_id: submitted.envelope_id,
            redirect_url: view.url,
        })
    }

    /// Current status of one envelope
    pub async fn get_envelope_status(
        &self,
        ctx: &SessionContext,
        envelope_id: Option<&str>,
    ) -> Result<StatusRecord> {
        let envelope_id = envelope_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                GatewayError::Validation("envelopeId query parameter is required".into())
            })?;

        let credential = self.credential(ctx).await?;
        match self
            .status
            .get_envelope_status(&credential, &self.config.account_id, envelope_id)
            .await
        {
            Ok(record) => Ok(record),
            Err(e) => Err(self.settle(ctx, e).await),
        }
    }

    /// Envelopes whose status changed within `[from_date, to_date]`
    ///
    /// `statuses` narrows the fixed allow-list; `None` selects all of it.
    pub async fn list_status_changes(
        &self,
        ctx: &SessionContext,
        from_date: Option<&str>,
        to_date: Option<&str>,
        statuses: Option<&str>,
    ) -> Result<StatusChangesResponse> {
        let query = status_changes_query(from_date, to_date, parse_status_filter(statuses)?)?;

        let credential = self.credential(ctx).await?;
        match self
            .status
            .list_status_changes(&credential, &self.config.account_id, &query)
            .await
        {
            Ok(envelopes) => Ok(StatusChangesResponse {
                result_set_size: envelopes.len(),
                envelopes,
            }),
            Err(e) => Err(self.settle(ctx, e).await),
        }
    }

    /// The signing ceremony redirected back to the app
    pub fn success_callback(&self, ctx: &SessionContext, event: Option<&str>) -> SuccessAck {
        let event = event.map(str::trim).filter(|e| !e.is_empty()).map(String::from);
        match event.as_deref() {
            Some("signing_complete") | None => {
                info!(session_id = %ctx.session_id(), event = ?event, "Signing ceremony finished")
            }
            Some(other) => {
                warn!(session_id = %ctx.session_id(), event = %other, "Signing ceremony ended without signature")
            }
        }
        SuccessAck {
            status: "Success",
            event,
        }
    }

    async fn credential(&self, ctx: &SessionContext) -> Result<SessionCredential> {
        self.credentials.get_valid_credential(ctx.credential()).await
    }

    /// A token the provider rejected is dropped, so the next request issues
    /// a fresh one
    async fn settle(&self, ctx: &SessionContext, err: GatewayError) -> GatewayError {
        if matches!(err, GatewayError::Auth(_)) {
            warn!(session_id = %ctx.session_id(), "Dropping rejected access token");
            ctx.credential().clear().await;
        }
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{CredentialPolicy, IssuedToken, TokenIssuer};
    use crate::envelope::EnvelopeDefinition;
    use crate::esign::{
        EnvelopeStatus, EnvelopeSummary, RecipientViewRequest, StatusChangesQuery, ViewUrl,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct CountingIssuer(AtomicUsize);

    #[async_trait]
    impl TokenIssuer for CountingIssuer {
        async fn issue_token(&self) -> Result<IssuedToken> {
            let n = self.0.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(IssuedToken {
                access_token: format!("token-{n}"),
                token_type: "Bearer".into(),
                expires_in: 600,
            })
        }
    }

    #[derive(Default)]
    struct RecordingApi {
        created: Mutex<Vec<EnvelopeDefinition>>,
        remote_calls: AtomicUsize,
        reject_token: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl EnvelopesApi for RecordingApi {
        async fn create_envelope(
            &self,
            _credential: &SessionCredential,
            _account_id: &str,
            envelope: &EnvelopeDefinition,
        ) -> Result<EnvelopeSummary> {
            self.remote_calls.fetch_add(1, Ordering::SeqCst);
            if self.reject_token.load(Ordering::SeqCst) {
                return Err(GatewayError::Auth("Access token rejected".into()));
            }
            self.created.lock().unwrap().push(envelope.clone());
            Ok(EnvelopeSummary {
                envelope_id: "E1".into(),
                status: Some(EnvelopeStatus::Sent),
                status_date_time: None,
                uri: None,
            })
        }

        async fn create_recipient_view(
            &self,
            _credential: &SessionCredential,
            _account_id: &str,
            envelope_id: &str,
            _request: &RecipientViewRequest,
        ) -> Result<ViewUrl> {
            self.remote_calls.fetch_add(1, Ordering::SeqCst);
            Ok(ViewUrl {
                url: format!("https://sign.example/{envelope_id}"),
            })
        }

        async fn get_envelope(
            &self,
            _credential: &SessionCredential,
            _account_id: &str,
            envelope_id: &str,
        ) -> Result<StatusRecord> {
            self.remote_calls.fetch_add(1, Ordering::SeqCst);
            Ok(StatusRecord {
                envelope_id: envelope_id.to_string(),
                status: EnvelopeStatus::Sent,
                email_subject: None,
                created_date_time: None,
                sent_date_time: None,
                delivered_date_time: None,
                completed_date_time: None,
                status_changed_date_time: None,
            })
        }

        async fn list_status_changes(
            &self,
            _credential: &SessionCredential,
            _account_id: &str,
            _query: &StatusChangesQuery,
        ) -> Result<Vec<StatusRecord>> {
            self.remote_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![])
        }
    }

    fn workflow() -> (EnvelopeWorkflow, Arc<CountingIssuer>, Arc<RecordingApi>) {
        let issuer = Arc::new(CountingIssuer(AtomicUsize::new(0)));
        let api = Arc::new(RecordingApi::default());
        let template = EnvelopeTemplate {
            client_user_id: "1001".into(),
            ..EnvelopeTemplate::default()
        };
        let workflow = EnvelopeWorkflow::new(
            CredentialCache::new(issuer.clone(), CredentialPolicy::default()),
            api.clone(),
            template,
            DocumentAsset::from_bytes("contract.pdf", b"%PDF (Signature: /sn1/)".to_vec()),
            WorkflowConfig {
                account_id: "acct".into(),
                return_url: "http://localhost:3000/success".into(),
            },
        );
        (workflow, issuer, api)
    }

    #[tokio::test]
    async fn test_submit_reuses_session_token() {
        let (workflow, issuer, api) = workflow();
        let ctx = SessionContext::new("sess_1");

        let first = workflow
            .submit_envelope(&ctx, "Jane Doe", "jane@example.com")
            .await
            .unwrap();
        workflow
            .get_envelope_status(&ctx, Some(&first.envelope_id))
            .await
            .unwrap();

        assert_eq!(first.envelope_id, "E1");
        assert_eq!(first.redirect_url, "https://sign.example/E1");
        assert_eq!(issuer.0.load(Ordering::SeqCst), 1);
        assert_eq!(api.created.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_submit_validates_before_token() {
        let (workflow, issuer, api) = workflow();
        let ctx = SessionContext::new("sess_1");

        let result = workflow.submit_envelope(&ctx, "", "jane@example.com").await;
        assert!(matches!(result, Err(GatewayError::Validation(_))));

        let result = workflow.submit_envelope(&ctx, "Jane", "not-an-email").await;
        assert!(matches!(result, Err(GatewayError::Validation(_))));

        assert_eq!(issuer.0.load(Ordering::SeqCst), 0);
        assert_eq!(api.remote_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_range_with_only_from_date_makes_no_calls() {
        let (workflow, issuer, api) = workflow();
        let ctx = SessionContext::new("sess_1");

        let result = workflow
            .list_status_changes(&ctx, Some("2024-01-01"), None, None)
            .await;

        assert!(matches!(result, Err(GatewayError::Validation(_))));
        assert_eq!(issuer.0.load(Ordering::SeqCst), 0);
        assert_eq!(api.remote_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_envelope_id_is_validation_error() {
        let (workflow, _, api) = workflow();
        let ctx = SessionContext::new("sess_1");

        let result = workflow.get_envelope_status(&ctx, Some("  ")).await;
        assert!(matches!(result, Err(GatewayError::Validation(_))));
        assert_eq!(api.remote_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rejected_token_is_dropped_from_session() {
        let (workflow, issuer, api) = workflow();
        let ctx = SessionContext::new("sess_1");
        api.reject_token.store(true, Ordering::SeqCst);

        let result = workflow
            .submit_envelope(&ctx, "Jane Doe", "jane@example.com")
            .await;
        assert!(matches!(result, Err(GatewayError::Auth(_))));
        assert!(ctx.credential().current().await.is_none());

        api.reject_token.store(false, Ordering::SeqCst);
        workflow
            .submit_envelope(&ctx, "Jane Doe", "jane@example.com")
            .await
            .unwrap();
        assert_eq!(issuer.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_success_callback_ack() {
        let (workflow, _, _) = workflow();
        let ctx = SessionContext::new("sess_1");

        let ack = workflow.success_callback(&ctx, Some("signing_complete"));
        assert_eq!(ack.status, "Success");
        assert_eq!(ack.event.as_deref(), Some("signing_complete"));

        assert_eq!(workflow.success_callback(&ctx, None).event, None);
    }
}
