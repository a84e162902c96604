//! Browser sessions and the session cookie

pub mod store;

pub use store::{spawn_cleanup_task, SessionContext, SessionStore, SessionStoreStats};

/// Name of the cookie carrying the session id
pub const SESSION_COOKIE: &str = "esign_session";

/// Extract the session id from a `Cookie` header value
pub fn session_id_from_cookie(header: &str) -> Option<&str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value for a newly created session
pub fn session_cookie(session_id: &str, max_age_secs: u64) -> String {
    format!(
        "{SESSION_COOKIE}={session_id}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}"
    )
}
