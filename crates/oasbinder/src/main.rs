//! oasbinder
//!
//! Gateway that lets users browse the OpenAPI specs of many microservices
//! through one Swagger UI page.
//!
//! ## Configuration
//!
//! Flags override `OASBINDER_*` environment variables, which override the
//! YAML config file (`--config`, default `$HOME/.oasbinder.yaml`):
//! - `-a/--address`: address where users reach oasbinder (default: http://localhost:8080)
//! - `-p/--port`: listening port (default: 8080)
//! - `-s/--api-specs-path`: path where microservices expose their spec (default: /openapi.json)
//! - `-l/--log-level`: trace, debug, info, warn or error (default: info)
//!
//! Microservices and extra request headers are only configurable in the file.

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use clap::{Parser, Subcommand};
use oasbinder::{middleware, routes, Aggregator, ReqwestSpecFetcher};
use shared::{Config, Overrides};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "oasbinder", version, about = "Browse the OpenAPI specs of many microservices through one Swagger UI")]
struct Cli {
    /// Config file (default is $HOME/.oasbinder.yaml)
    #[arg(short = 'c', long, env = "OASBINDER_CONFIG")]
    config: Option<PathBuf>,

    /// Logging level (trace, debug, info, warn, error)
    #[arg(short = 'l', long = "log-level")]
    log_level: Option<String>,

    /// Address where oasbinder is accessed by the user: http[s]://hostname.example.com[:port]
    #[arg(short = 'a', long)]
    address: Option<String>,

    /// Port number on which oasbinder will be listening
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Path where microservices expose their API specification
    #[arg(short = 's', long = "api-specs-path")]
    api_specs_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            config_file: self.config.clone(),
            log_level: self.log_level.clone(),
            address: self.address.clone(),
            port: self.port,
            api_specs_path: self.api_specs_path.clone(),
        }
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::Version) = cli.command {
        println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Load configuration
    let config = Config::load(&cli.overrides()).context("Failed to load configuration")?;

    // Initialize tracing
    shared::init_tracing(&config.server.log_level);

    tracing::info!("Starting oasbinder v{}...", env!("CARGO_PKG_VERSION"));
    config.log_summary();

    let gateway = Arc::new(config.gateway.clone());
    let fetcher = ReqwestSpecFetcher::new(&gateway).context("Failed to create spec fetcher")?;
    let aggregator = Aggregator::new(gateway, Arc::new(fetcher));

    let server_addr = config.server.bind_address();
    tracing::info!("oasbinder listening on {}", server_addr);

    // Start HTTP server
    HttpServer::new(move || {
        App::new()
            .wrap(middleware::security_headers())
            .wrap(middleware::RequestId)
            .wrap(middleware::tracing_logger())
            .app_data(web::Data::new(aggregator.clone()))
            .configure(routes::configure)
    })
    .client_request_timeout(Duration::from_secs(config.server.read_timeout_secs))
    .client_disconnect_timeout(Duration::from_secs(config.server.disconnect_timeout_secs))
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind to {}", server_addr))?
    .run()
    .await
    .context("Server error")?;

    Ok(())
}
