//! Envelope endpoints
//!
//! - `POST /form` - create an envelope for the submitted signer, answer with
//!   its id and the embedded signing URL
//! - `GET /listStatus?envelopeId=` - status of one envelope
//! - `GET /listStatusChanges?fromDate=&toDate=[&status=]` - status changes in a range
//! - `GET /success[?event=]` - return target of the signing ceremony

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

use super::{error_response, json_response};
use crate::services::EnvelopeWorkflow;
use crate::session::SessionContext;
use crate::types::{GatewayError, Result};

/// Signer details posted by the form
///
/// Extra form fields are ignored.
#[derive(Debug, Deserialize)]
pub struct SubmitForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Default, Deserialize)]
struct StatusParams {
    #[serde(rename = "envelopeId")]
    envelope_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StatusChangesParams {
    #[serde(rename = "fromDate")]
    from_date: Option<String>,
    #[serde(rename = "toDate")]
    to_date: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SuccessParams {
    event: Option<String>,
}

/// Decode the form body as JSON or urlencoded, by content type
pub fn parse_submit_form(content_type: Option<&str>, body: &[u8]) -> Result<SubmitForm> {
    let is_json = content_type
        .map(|ct| ct.trim_start().starts_with("application/json"))
        .unwrap_or(false);

    if is_json {
        serde_json::from_slice(body)
            .map_err(|e| GatewayError::Validation(format!("Invalid JSON body: {}", e)))
    } else {
        serde_urlencoded::from_bytes(body)
            .map_err(|e| GatewayError::Validation(format!("Invalid form body: {}", e)))
    }
}

fn parse_query<T: for<'de> Deserialize<'de> + Default>(query: Option<&str>) -> Result<T> {
    match query {
        Some(q) if !q.is_empty() => serde_urlencoded::from_str(q)
            .map_err(|e| GatewayError::Validation(format!("Invalid query string: {}", e))),
        _ => Ok(T::default()),
    }
}

/// Handle POST /form
pub async fn handle_submit_form(
    workflow: &EnvelopeWorkflow,
    ctx: &SessionContext,
    content_type: Option<&str>,
    body: Bytes,
) -> Response<Full<Bytes>> {
    let form = match parse_submit_form(content_type, &body) {
        Ok(form) => form,
        Err(e) => return error_response(&e),
    };
    debug!(session_id = %ctx.session_id(), name = %form.name, "Received form data");

    match workflow.submit_envelope(ctx, &form.name, &form.email).await {
        Ok(submitted) => json_response(StatusCode::OK, &submitted),
        Err(e) => error_response(&e),
    }
}

/// Handle GET /listStatus
pub async fn handle_list_status(
    workflow: &EnvelopeWorkflow,
    ctx: &SessionContext,
    query: Option<&str>,
) -> Response<Full<Bytes>> {
    let params: StatusParams = match parse_query(query) {
        Ok(p) => p,
        Err(e) => return error_response(&e),
    };

    match workflow
        .get_envelope_status(ctx, params.envelope_id.as_deref())
        .await
    {
        Ok(record) => json_response(StatusCode::OK, &record),
        Err(e) => error_response(&e),
    }
}

/// Handle GET /listStatusChanges
pub async fn handle_list_status_changes(
    workflow: &EnvelopeWorkflow,
    ctx: &SessionContext,
    query: Option<&str>,
) -> Response<Full<Bytes>> {
    let params: StatusChangesParams = match parse_query(query) {
        Ok(p) => p,
        Err(e) => return error_response(&e),
    };

    match workflow
        .list_status_changes(
            ctx,
            params.from_date.as_deref(),
            params.to_date.as_deref(),
            params.status.as_deref(),
        )
        .await
    {
        Ok(changes) => json_response(StatusCode::OK, &changes),
        Err(e) => error_response(&e),
    }
}

/// Handle GET /success
pub fn handle_success(
    workflow: &EnvelopeWorkflow,
    ctx: &SessionContext,
    query: Option<&str>,
) -> Response<Full<Bytes>> {
    let params: SuccessParams = match parse_query(query) {
        Ok(p) => p,
        Err(e) => return error_response(&e),
    };
    let ack = workflow.success_callback(ctx, params.event.as_deref());
    json_response(StatusCode::OK, &ack)
}
