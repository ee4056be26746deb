//! Shared library for the oasbinder gateway
//!
//! This crate provides the pieces that surround the request path:
//! - Configuration snapshot types and layered loading
//! - Error handling types
//! - Logging infrastructure

pub mod config;
pub mod error;

// Re-export commonly used types
pub use config::{Config, GatewayConfig, HeaderSet, MicroserviceConfig, Overrides, ServerConfig};
pub use error::{Error, Result};

/// Map a configured log level to a tracing directive, falling back to `info`
pub fn level_directive(log_level: &str) -> &'static str {
    match log_level.to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "info" => "info",
        "warn" | "warning" => "warn",
        "error" => "error",
        _ => "info",
    }
}

/// Initialize tracing subscriber for structured logging
///
/// `RUST_LOG` wins when set; otherwise the configured level applies to the
/// gateway crates and everything else logs at `info`.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = level_directive(log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("oasbinder={level},shared={level},info").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
