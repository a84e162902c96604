//! Health and version endpoints
//!
//! - /health, /healthz - Liveness probe, with session store counters
//! - /version - build information for deployment verification

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use super::json_response;
use crate::server::AppState;
use crate::session::SessionStoreStats;

/// Liveness response
#[derive(Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
    /// Uptime in seconds
    pub uptime: u64,
    pub timestamp: String,
    pub sessions: SessionStoreStats,
    /// Whether the signable document carries the expected anchor count
    #[serde(rename = "anchorCheck")]
    pub anchor_check: AnchorStatus,
}

#[derive(Serialize)]
pub struct AnchorStatus {
    pub document: String,
    pub anchor: String,
    pub expected: usize,
    pub found: usize,
    pub satisfied: bool,
}

/// Handle liveness probe (/health, /healthz)
pub fn health_check(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let template = state.workflow.template();
    let check = state.workflow.anchor_check();

    let response = HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION"),
        uptime: state.started_at.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        sessions: state.sessions.stats(),
        anchor_check: AnchorStatus {
            document: state.workflow.document().path().display().to_string(),
            anchor: template.anchor.anchor_string.clone(),
            expected: check.expected,
            found: check.found,
            satisfied: check.is_satisfied(),
        },
    };

    json_response(StatusCode::OK, &response)
}

/// Version information for deployment verification
#[derive(Serialize)]
pub struct VersionResponse {
    /// Cargo package version
    pub version: &'static str,
    /// Git commit hash (short)
    pub commit: &'static str,
    /// Git commit hash (full)
    pub commit_full: &'static str,
    /// Build timestamp
    pub build_time: &'static str,
    pub service: &'static str,
}

/// Handle version endpoint (/version)
pub fn version_info() -> Response<Full<Bytes>> {
    let response = VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
        commit_full: option_env!("GIT_COMMIT_FULL").unwrap_or("unknown"),
        build_time: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
        service: "envelope-gateway",
    };

    json_response(StatusCode::OK, &response)
}
