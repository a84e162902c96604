//! Envelope Gateway - embedded signing over the DocuSign eSignature API
//!
//! A signer submits their name and email, the gateway sends a fixed document
//! for signature and hands back a one-time URL for the embedded signing
//! ceremony. Envelope status can be queried afterwards.
//!
//! ## Services
//!
//! - **Auth**: JWT-bearer token issuance, cached per browser session
//! - **Envelope**: envelope definition around the signable document
//! - **E-sign**: REST client for envelopes, recipient views and status
//! - **Workflow**: submit, status, status changes, success callback

pub mod auth;
pub mod config;
pub mod envelope;
pub mod esign;
pub mod logging;
pub mod routes;
pub mod server;
pub mod services;
pub mod session;
pub mod types;

#[cfg(test)]
mod testing;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{GatewayError, Result};
