//! Route configuration for the gateway

use actix_web::web;

use crate::handlers;

/// Configure all routes
///
/// A single resource catches every path; the whole path is the routing key.
/// Methods other than GET answer 405.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/{routing_key:.*}").route(web::get().to(handlers::view_service)),
    );
}
