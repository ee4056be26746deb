//! Middleware for the gateway
//!
//! - [`security_headers`]: static hardening headers on every response
//! - [`tracing_logger`]: access log line and span per request
//! - [`RequestId`]: `X-Request-ID` correlation
//!
//! No Content-Security-Policy is set: the page loads Swagger UI from a CDN
//! and its "try it out" calls go to arbitrary backend origins.

pub mod request_id;

pub use request_id::{CorrelationId, RequestId};

use actix_web::middleware::DefaultHeaders;
use tracing_actix_web::TracingLogger;

/// Security headers added to every response
///
/// - `X-Content-Type-Options`: prevents MIME type sniffing
/// - `X-Frame-Options`: prevents clickjacking
/// - `Referrer-Policy`: keeps routing keys out of third-party referrers
pub fn security_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("X-Content-Type-Options", "nosniff"))
        .add(("X-Frame-Options", "DENY"))
        .add(("Referrer-Policy", "strict-origin-when-cross-origin"))
}

/// Access logging through `tracing`
pub fn tracing_logger() -> TracingLogger<tracing_actix_web::DefaultRootSpanBuilder> {
    TracingLogger::default()
}
