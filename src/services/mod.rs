//! Envelope services
//!
//! - **Signing views**: one-time embedded signing URLs
//! - **Status**: single-envelope status and status-change listings
//! - **Workflow**: the four operations exposed to the HTTP layer

pub mod signing_view;
pub mod status;
pub mod workflow;

pub use signing_view::{SigningViewRequester, SubmittedEnvelope};
pub use status::{parse_date, parse_status_filter, status_changes_query, StatusGateway};
pub use workflow::{
    EnvelopeWorkflow, StatusChangesResponse, SubmitResponse, SuccessAck, WorkflowConfig,
};
