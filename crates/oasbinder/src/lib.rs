//! oasbinder gateway library
//!
//! Serves the OpenAPI specs of several backend microservices through one
//! Swagger UI page. Exposed as a library for integration tests.
//!
//! Request flow: handler → aggregator (fetcher, once per configured
//! service) → renderer → response.

pub mod aggregator;
pub mod fetcher;
pub mod handlers;
pub mod middleware;
pub mod render;
pub mod routes;

pub use aggregator::{Aggregator, MicroserviceListEntry, RenderContext};
pub use fetcher::{FetchError, ReqwestSpecFetcher, SpecFetcher, SpecResult};
pub use render::RenderError;
