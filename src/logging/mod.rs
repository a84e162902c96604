//! Logging infrastructure for the envelope gateway
//!
//! `RUST_LOG` wins when set; otherwise the configured level applies to this
//! crate and `info` to everything else.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter directive used when `RUST_LOG` is absent
pub fn default_directive(log_level: &str) -> String {
    format!("envelope_gateway={},info", log_level)
}

/// Install the global subscriber, human-readable or JSON lines
pub fn init(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(log_level)));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
