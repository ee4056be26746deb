//! Service view endpoint
//!
//! `GET /{routing_key}` renders the picker and, when the key names a service
//! whose spec could be fetched, the Swagger UI viewer for it.

use actix_web::{web, HttpRequest, HttpResponse};

use crate::aggregator::Aggregator;
use crate::middleware::CorrelationId;
use crate::render;

/// Body sent when the page cannot be assembled
pub const RENDER_FAILURE_BODY: &str = "Could not generate HTML";

/// Render the view for the requested routing key
///
/// Backend failures are reported inside the page with a 200; only a
/// rendering failure produces an error status.
pub async fn view_service(req: HttpRequest, aggregator: web::Data<Aggregator>) -> HttpResponse {
    let routing_key = req.match_info().query("routing_key");
    let request_id = CorrelationId::of(&req);
    tracing::debug!(
        request_id = %request_id,
        path = %req.path(),
        routing_key = %routing_key,
        "View requested"
    );

    let context = aggregator.aggregate(routing_key).await;

    match render::render(&context) {
        Ok(html) => HttpResponse::Ok().content_type("text/html").body(html),
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                error = %e,
                routing_key = %routing_key,
                "Failed to render view"
            );
            HttpResponse::InternalServerError()
                .content_type("text/plain")
                .body(RENDER_FAILURE_BODY)
        }
    }
}
