//! E-signature service access

pub mod client;
pub mod types;

pub use client::{classify_failure, ApiConfig, EnvelopesApi, RestEnvelopesApi};
pub use types::{
    EnvelopeStatus, EnvelopeSummary, RecipientViewRequest, StatusChangesQuery, StatusFilter,
    StatusRecord, ViewUrl,
};
