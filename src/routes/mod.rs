//! HTTP routes for the envelope gateway

pub mod envelopes;
pub mod form;
pub mod health;

pub use envelopes::{
    handle_list_status, handle_list_status_changes, handle_submit_form, handle_success,
};
pub use form::index_page;
pub use health::{health_check, version_info};

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::types::GatewayError;

/// Serialize `body` as a JSON response
pub(crate) fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    match serde_json::to_string(body) {
        Ok(json) => Response::builder()
            .status(status)
            .header("Content-Type", "application/json")
            .header("Access-Control-Allow-Origin", "*")
            .header("Cache-Control", "no-store")
            .body(Full::new(Bytes::from(json)))
            .unwrap_or_else(|_| internal_error_response()),
        Err(_) => internal_error_response(),
    }
}

/// JSON error body `{ "error": ..., "code": ... }` with the error's status
pub(crate) fn error_response(err: &GatewayError) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": err.to_string(),
        "code": err.code(),
    });
    json_response(err.status_code(), &body)
}

fn internal_error_response() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(
        b"{\"error\":\"Failed to build response\",\"code\":\"INTERNAL_ERROR\"}",
    )));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_error_response_shape() {
        let response = error_response(&GatewayError::Validation("envelopeId is required".into()));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert!(json["error"].as_str().unwrap().contains("envelopeId"));
    }
}
