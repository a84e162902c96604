//! Wire types of the eSignature REST API (v2.1)
//!
//! Field names are dictated by the provider; only the fields this gateway
//! reads or writes are modelled.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::envelope::SignerIdentity;

/// Response to envelope creation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeSummary {
    pub envelope_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<EnvelopeStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

/// Request for an embedded signing ceremony URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientViewRequest {
    pub return_url: String,
    pub authentication_method: String,
    pub email: String,
    pub user_name: String,
    pub client_user_id: String,
}

impl RecipientViewRequest {
    /// The app has already authenticated the user, so the provider adds none
    pub const AUTHENTICATION_METHOD: &'static str = "none";

    pub fn embedded(signer: &SignerIdentity, return_url: &str) -> Self {
        Self {
            return_url: return_url.to_string(),
            authentication_method: Self::AUTHENTICATION_METHOD.to_string(),
            email: signer.email.clone(),
            user_name: signer.name.clone(),
            client_user_id: signer.client_user_id.clone(),
        }
    }
}

/// Single-use signing ceremony URL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewUrl {
    pub url: String,
}

/// Envelope status as reported by the provider
///
/// The lifecycle is owned remotely: `created -> sent -> delivered -> completed`,
/// with `declined` and `voided` as terminal side exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeStatus {
    Created,
    Sent,
    Delivered,
    Completed,
    Declined,
    Voided,
    #[serde(other)]
    Unknown,
}

impl EnvelopeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Completed => "completed",
            Self::Declined => "declined",
            Self::Voided => "voided",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Declined | Self::Voided)
    }
}

/// Observed state of one envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRecord {
    pub envelope_id: String,
    pub status: EnvelopeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_changed_date_time: Option<String>,
}

/// Response of the envelope listing endpoint
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopesInformation {
    #[serde(default)]
    pub envelopes: Vec<StatusRecord>,
    #[serde(default)]
    pub result_set_size: Option<String>,
    #[serde(default)]
    pub total_set_size: Option<String>,
}

/// Statuses a status-change listing may ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    Sent,
    Delivered,
    Completed,
}

impl StatusFilter {
    /// The fixed allow-list
    pub const ALL: [StatusFilter; 3] = [Self::Sent, Self::Delivered, Self::Completed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Completed => "completed",
        }
    }

    pub fn matches(&self, status: EnvelopeStatus) -> bool {
        matches!(
            (self, status),
            (Self::Sent, EnvelopeStatus::Sent)
                | (Self::Delivered, EnvelopeStatus::Delivered)
                | (Self::Completed, EnvelopeStatus::Completed)
        )
    }
}

/// Validated range query for status changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChangesQuery {
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub statuses: Vec<StatusFilter>,
}

impl StatusChangesQuery {
    /// Query string pairs in the provider's parameter names
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let status = self
            .statuses
            .iter()
            .map(StatusFilter::as_str)
            .collect::<Vec<_>>()
            .join(",");
        vec![
            ("from_date", self.from_date.format("%Y-%m-%d").to_string()),
            ("to_date", self.to_date.format("%Y-%m-%d").to_string()),
            ("status", status),
        ]
    }

    pub fn admits(&self, status: EnvelopeStatus) -> bool {
        self.statuses.iter().any(|f| f.matches(status))
    }
}

/// Error body returned by the REST API
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderError {
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_view_request() {
        let signer = SignerIdentity {
            name: "Jane Doe".to_string(),
            email: "jane@example.com".to_string(),
            client_user_id: "1001".to_string(),
        };
        let request = RecipientViewRequest::embedded(&signer, "http://localhost:3000/success");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["authenticationMethod"], "none");
        assert_eq!(json["userName"], "Jane Doe");
        assert_eq!(json["clientUserId"], "1001");
        assert_eq!(json["returnUrl"], "http://localhost:3000/success");
    }

    #[test]
    fn test_status_record_parses_provider_envelope() {
        let body = r#"{
            "envelopeId": "E1",
            "status": "completed",
            "emailSubject": "Please sign this document",
            "completedDateTime": "2024-01-10T10:00:00.0000000Z",
            "purgeState": "unpurged"
        }"#;
        let record: StatusRecord = serde_json::from_str(body).unwrap();
        assert_eq!(record.envelope_id, "E1");
        assert_eq!(record.status, EnvelopeStatus::Completed);
        assert!(record.status.is_terminal());
    }

    #[test]
    fn test_unknown_status_tolerated() {
        let record: StatusRecord =
            serde_json::from_str(r#"{"envelopeId":"E2","status":"timedout"}"#).unwrap();
        assert_eq!(record.status, EnvelopeStatus::Unknown);
    }

    #[test]
    fn test_recipient_status_is_not_an_envelope_status() {
        let record: StatusRecord =
            serde_json::from_str(r#"{"envelopeId":"E3","status":"signed"}"#).unwrap();
        assert_eq!(record.status, EnvelopeStatus::Unknown);
        assert!(!record.status.is_terminal());
    }

    #[test]
    fn test_query_pairs() {
        let query = StatusChangesQuery {
            from_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            to_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            statuses: StatusFilter::ALL.to_vec(),
        };
        let pairs = query.query_pairs();
        assert_eq!(pairs[0], ("from_date", "2024-01-01".to_string()));
        assert_eq!(pairs[1], ("to_date", "2024-01-31".to_string()));
        assert_eq!(pairs[2], ("status", "sent,delivered,completed".to_string()));

        assert!(query.admits(EnvelopeStatus::Delivered));
        assert!(!query.admits(EnvelopeStatus::Voided));
        assert!(!query.admits(EnvelopeStatus::Created));
    }
}
