//! Request routing and spec aggregation
//!
//! Every request fetches the spec of every configured microservice so the
//! picker can show live titles. The request path selects at most one of
//! them; that service's spec (or its fetch error) decides what the view shows.

use futures_util::future::join_all;
use shared::{GatewayConfig, HeaderSet, MicroserviceConfig};
use std::sync::Arc;

use crate::fetcher::{SpecFetcher, SpecResult};

/// Shown when the path selects no configured service
pub const SELECT_SERVICE_MESSAGE: &str = "Please select a service from the list.";

/// Prefix of the message shown when the selected service's spec is unavailable
pub const FETCH_FAILED_PREFIX: &str = "Could not retrieve OpenAPI spec: ";

/// One option of the service picker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MicroserviceListEntry {
    pub label: String,
    pub routing_key: String,
    pub selected: bool,
}

/// Everything the renderer needs for one response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderContext {
    /// Raw spec of the selected service; empty unless the viewer is shown
    pub spec: String,
    /// Picker entries in configuration order
    pub list: Vec<MicroserviceListEntry>,
    /// Routing key taken from the request path (may match nothing)
    pub selected_key: String,
    /// Base URL of the selected service, target of the request rewrite
    pub service_url: String,
    /// Externally visible address of the gateway
    pub gateway_address: String,
    pub headers: HeaderSet,
    /// Empty means "render the viewer"; anything else replaces it
    pub message: String,
}

impl RenderContext {
    pub fn shows_viewer(&self) -> bool {
        self.message.is_empty()
    }
}

/// Extract the routing key from a request path (`/svc1` -> `svc1`)
pub fn routing_key_from_path(request_path: &str) -> &str {
    request_path.strip_prefix('/').unwrap_or(request_path)
}

/// Picker label for a service: `title — summary`, whichever half exists, or
/// the configured name / routing key when the spec gave neither
pub fn display_label(service: &MicroserviceConfig, result: &SpecResult) -> String {
    match (result.title.is_empty(), result.summary.is_empty()) {
        (false, false) => format!("{} — {}", result.title, result.summary),
        (false, true) => result.title.clone(),
        (true, false) => result.summary.clone(),
        (true, true) => service
            .name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| service.endpoint.clone()),
    }
}

/// Builds a [`RenderContext`] for an incoming request path
#[derive(Clone)]
pub struct Aggregator {
    config: Arc<GatewayConfig>,
    fetcher: Arc<dyn SpecFetcher>,
}

impl Aggregator {
    pub fn new(config: Arc<GatewayConfig>, fetcher: Arc<dyn SpecFetcher>) -> Self {
        Self { config, fetcher }
    }

    /// Aggregate specs and decide what the response shows
    ///
    /// Each configured service is fetched exactly once. The fetches are
    /// independent and run concurrently; results keep configuration order.
    pub async fn aggregate(&self, request_path: &str) -> RenderContext {
        let routing_key = routing_key_from_path(request_path);
        tracing::debug!(path = %request_path, routing_key = %routing_key, "Aggregating specs");

        let services = &self.config.services;
        let results = join_all(services.iter().map(|s| self.fetcher.fetch(s))).await;

        let selected = if routing_key.is_empty() {
            None
        } else {
            services.iter().position(|s| s.endpoint == routing_key)
        };

        let list = services
            .iter()
            .zip(&results)
            .enumerate()
            .map(|(index, (service, result))| {
                let is_selected = selected == Some(index);
                if let Some(err) = &result.error {
                    if !is_selected {
                        tracing::warn!(
                            endpoint = %service.endpoint,
                            error = %err,
                            "Spec fetch failed for listed microservice"
                        );
                    }
                }
                MicroserviceListEntry {
                    label: display_label(service, result),
                    routing_key: service.endpoint.clone(),
                    selected: is_selected,
                }
            })
            .collect();

        let mut context = RenderContext {
            spec: String::new(),
            list,
            selected_key: routing_key.to_string(),
            service_url: String::new(),
            gateway_address: self.config.address.clone(),
            headers: self.config.headers.clone(),
            message: String::new(),
        };

        match selected {
            None => {
                context.message = SELECT_SERVICE_MESSAGE.to_string();
            }
            Some(index) => {
                let service = &services[index];
                let result = &results[index];
                match (&result.error, result.is_usable()) {
                    (Some(err), false) => {
                        tracing::warn!(
                            endpoint = %service.endpoint,
                            error = %err,
                            "Spec fetch failed for selected microservice"
                        );
                        context.message = format!("{}{}", FETCH_FAILED_PREFIX, err);
                    }
                    (error, _) => {
                        if let Some(err) = error {
                            tracing::debug!(
                                endpoint = %service.endpoint,
                                error = %err,
                                "Serving spec that could not be parsed"
                            );
                        }
                        context.spec = result.spec_text();
                        context.service_url = service.url.clone();
                    }
                }
            }
        }

        context
    }
}
