//! Common test utilities for integration tests
//!
//! Provides a throw-away backend microservice bound to a random local port,
//! plus helpers for building gateway configuration snapshots.

use actix_web::{http::StatusCode, web, App, HttpRequest, HttpResponse, HttpServer};
use shared::{GatewayConfig, HeaderSet, MicroserviceConfig};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Address the tests pretend users reach the gateway under
pub const GATEWAY_ADDRESS: &str = "http://gateway.example.com";

/// Header attached to outbound spec requests in tests
pub const TEST_HEADER_NAME: &str = "X-Api-Key";
pub const TEST_HEADER_VALUE: &str = "abc123";

/// Requests observed by a [`TestBackend`]
#[derive(Debug, Clone, Default)]
pub struct SeenRequest {
    pub path: String,
    pub api_key: Option<String>,
}

/// A backend microservice answering every request with a fixed status and body
pub struct TestBackend {
    port: u16,
    hits: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

impl TestBackend {
    /// Start a backend. Must be called from inside an actix system
    /// (`#[actix_web::test]`).
    pub fn start(status: u16, body: &'static str) -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind test backend");
        let port = listener.local_addr().expect("Failed to read local address").port();
        let status = StatusCode::from_u16(status).expect("Invalid status code");

        let server_hits = hits.clone();
        let server_seen = seen.clone();
        let server = HttpServer::new(move || {
            let hits = server_hits.clone();
            let seen = server_seen.clone();
            App::new().default_service(web::to(move |req: HttpRequest| {
                let hits = hits.clone();
                let seen = seen.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    seen.lock().expect("seen lock poisoned").push(SeenRequest {
                        path: req.path().to_string(),
                        api_key: req
                            .headers()
                            .get(TEST_HEADER_NAME)
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string),
                    });
                    HttpResponse::build(status)
                        .content_type("application/json")
                        .body(body)
                }
            }))
        })
        .workers(1)
        .listen(listener)
        .expect("Failed to listen on test backend")
        .run();

        actix_rt::spawn(server);

        Self { port, hits, seen }
    }

    /// Base URL with the trailing '/' the gateway requires
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}/", self.port)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    #[allow(dead_code)]
    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().expect("seen lock poisoned").clone()
    }
}

/// A port with nothing listening on it
#[allow(dead_code)]
pub fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind probe socket");
    let port = listener.local_addr().expect("Failed to read local address").port();
    drop(listener);
    format!("http://127.0.0.1:{}/", port)
}

/// Gateway snapshot with the test header and default spec path
pub fn gateway_config(services: Vec<MicroserviceConfig>) -> GatewayConfig {
    let mut headers = HeaderSet::new();
    headers.insert(TEST_HEADER_NAME.to_string(), TEST_HEADER_VALUE.to_string());
    GatewayConfig {
        services,
        headers,
        api_specs_path: "/openapi.json".to_string(),
        address: GATEWAY_ADDRESS.to_string(),
    }
}
