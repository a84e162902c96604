//! Envelope status queries
//!
//! Read-only and idempotent. Range queries are validated before any token is
//! requested or any remote call is made.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, error};

use crate::auth::SessionCredential;
use crate::esign::{EnvelopesApi, StatusChangesQuery, StatusFilter, StatusRecord};
use crate::types::{GatewayError, Result};

/// Parse a calendar date bound (`YYYY-MM-DD`)
///
/// Timestamps are rejected rather than truncated to their date.
pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| {
            GatewayError::Validation(format!("{field} must be a date (YYYY-MM-DD), got {value:?}"))
        })
}

/// Parse a comma separated status list against the allow-list
///
/// An absent or empty list means the whole allow-list.
pub fn parse_status_filter(value: Option<&str>) -> Result<Vec<StatusFilter>> {
    let Some(value) = value.filter(|v| !v.trim().is_empty()) else {
        return Ok(StatusFilter::ALL.to_vec());
    };

    let mut filters = Vec::new();
    for part in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let filter = StatusFilter::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(part))
            .ok_or_else(|| {
                GatewayError::Validation(format!(
                    "status {part:?} is not one of sent, delivered, completed"
                ))
            })?;
        if !filters.contains(&filter) {
            filters.push(filter);
        }
    }
    Ok(filters)
}

/// Build a range query; both bounds are required together
pub fn status_changes_query(
    from_date: Option<&str>,
    to_date: Option<&str>,
    statuses: Vec<StatusFilter>,
) -> Result<StatusChangesQuery> {
    let from = from_date.filter(|v| !v.trim().is_empty());
    let to = to_date.filter(|v| !v.trim().is_empty());

    let (from, to) = match (from, to) {
        (Some(from), Some(to)) => (parse_date("fromDate", from)?, parse_date("toDate", to)?),
        _ => {
            return Err(GatewayError::Validation(
                "fromDate and toDate query parameters are required".into(),
            ))
        }
    };

    if from > to {
        return Err(GatewayError::Validation(format!(
            "fromDate {from} is after toDate {to}"
        )));
    }

    if statuses.is_empty() {
        return Err(GatewayError::Validation("at least one status is required".into()));
    }

    Ok(StatusChangesQuery {
        from_date: from,
        to_date: to,
        statuses,
    })
}

/// Fetches envelope status from the provider
#[derive(Clone)]
pub struct StatusGateway {
    api: Arc<dyn EnvelopesApi>,
}

impl StatusGateway {
    pub fn new(api: Arc<dyn EnvelopesApi>) -> Self {
        Self { api }
    }

    pub async fn get_envelope_status(
        &self,
        credential: &SessionCredential,
        account_id: &str,
        envelope_id: &str,
    ) -> Result<StatusRecord> {
        if envelope_id.trim().is_empty() {
            return Err(GatewayError::Validation(
                "envelopeId query parameter is required".into(),
            ));
        }

        self.api
            .get_envelope(credential, account_id, envelope_id.trim())
            .await
            .map_err(|e| {
                error!(envelope_id = %envelope_id, error = %e, "Error getting envelope status");
                e
            })
    }

    /// Status changes in the query range, restricted to the query's statuses
    pub async fn list_status_changes(
        &self,
        credential: &SessionCredential,
        account_id: &str,
        query: &StatusChangesQuery,
    ) -> Result<Vec<StatusRecord>> {
        let mut records = self
            .api
            .list_status_changes(credential, account_id, query)
            .await
            .map_err(|e| {
                error!(error = %e, "Error getting envelope status changes");
                e
            })?;

        let received = records.len();
        records.retain(|r| query.admits(r.status));
        if records.len() != received {
            debug!(
                dropped = received - records.len(),
                "Discarded records outside the status filter"
            );
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_bounds_required() {
        let only_from = status_changes_query(Some("2024-01-01"), None, StatusFilter::ALL.to_vec());
        assert!(matches!(only_from, Err(GatewayError::Validation(_))));

        let only_to = status_changes_query(None, Some("2024-01-31"), StatusFilter::ALL.to_vec());
        assert!(matches!(only_to, Err(GatewayError::Validation(_))));

        let blank = status_changes_query(Some(" "), Some("2024-01-31"), StatusFilter::ALL.to_vec());
        assert!(matches!(blank, Err(GatewayError::Validation(_))));
    }

    #[test]
    fn test_range_parsing() {
        let query =
            status_changes_query(Some("2024-01-01"), Some(" 2024-01-31 "), StatusFilter::ALL.to_vec())
                .unwrap();
        assert_eq!(query.from_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(query.to_date, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());

        assert!(status_changes_query(Some("2024-02-01"), Some("2024-01-01"), StatusFilter::ALL.to_vec()).is_err());
        assert!(status_changes_query(Some("January"), Some("2024-01-01"), StatusFilter::ALL.to_vec()).is_err());
    }

    #[test]
    fn test_timestamp_bound_rejected() {
        let result = parse_date("toDate", "2024-01-31T23:59:59Z");
        assert!(matches!(result, Err(GatewayError::Validation(_))));

        let result = status_changes_query(
            Some("2024-01-01T00:00:00+02:00"),
            Some("2024-01-31"),
            StatusFilter::ALL.to_vec(),
        );
        assert!(matches!(result, Err(GatewayError::Validation(_))));
    }

    #[test]
    fn test_status_filter_allow_list() {
        assert_eq!(parse_status_filter(None).unwrap(), StatusFilter::ALL.to_vec());
        assert_eq!(
            parse_status_filter(Some("Completed, sent,sent")).unwrap(),
            vec![StatusFilter::Completed, StatusFilter::Sent]
        );
        assert!(matches!(
            parse_status_filter(Some("sent,voided")),
            Err(GatewayError::Validation(_))
        ));
    }
}
