//! Service authentication for the e-signature API
//!
//! Provides:
//! - JWT-bearer assertion signing and token exchange
//! - Session-scoped credential caching with a safety margin

pub mod credential;
pub mod jwt;

pub use credential::{CredentialCache, CredentialPolicy, CredentialSlot, SessionCredential};
pub use jwt::{
    build_assertion, redact, IssuedToken, JwtGrantIssuer, PrivateKey, ServiceIdentity,
    TokenIssuer,
};
