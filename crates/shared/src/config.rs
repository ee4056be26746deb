//! Configuration management
//!
//! The gateway is configured from, in increasing order of precedence:
//!
//! 1. Built-in defaults
//! 2. A YAML file (`--config`, otherwise `$HOME/.oasbinder.yaml` when present)
//! 3. `OASBINDER_*` environment variables (a `.env` file is honoured)
//! 4. Command-line flags, passed in as [`Overrides`]
//!
//! The result is an immutable snapshot. The request path only ever sees the
//! [`GatewayConfig`] half of it, shared behind an `Arc`.
//!
//! # Example file
//!
//! ```yaml
//! address: https://oasbinder.example.com
//! apiSpecsPath: /openapi.json
//! services:
//!   - endpoint: users
//!     url: http://users.internal:8000/
//!     name: Users API
//! headers:
//!   X-Api-Key: abc123
//! ```

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::env;
use std::path::{Path, PathBuf};

/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "OASBINDER";

/// Name of the config file looked up in the home directory
pub const DEFAULT_CONFIG_FILE_NAME: &str = ".oasbinder.yaml";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_ADDRESS: &str = "http://localhost:8080";
const DEFAULT_API_SPECS_PATH: &str = "/openapi.json";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Extra headers attached to every outbound spec request.
///
/// Ordered so that rendering the headers into the viewer is deterministic.
pub type HeaderSet = BTreeMap<String, String>;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Listener configuration
    pub server: ServerConfig,

    /// Snapshot consumed by the aggregation core
    pub gateway: GatewayConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Deadline for reading a request head
    pub read_timeout_secs: u64,

    /// How long a client gets to acknowledge connection shutdown once the
    /// response has been written
    pub disconnect_timeout_secs: u64,

    /// trace, debug, info, warn or error
    pub log_level: String,
}

impl ServerConfig {
    /// Socket address string for `HttpServer::bind`
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// The configuration snapshot read by the fetcher, aggregator and renderer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Configured microservices, in picker order
    pub services: Vec<MicroserviceConfig>,

    /// Headers sent with every spec request and every "try it out" call
    pub headers: HeaderSet,

    /// Suffix appended to a microservice base URL to reach its spec
    pub api_specs_path: String,

    /// Address under which users reach this gateway, e.g. `https://docs.example.com`
    pub address: String,
}

/// A backend microservice exposing an OpenAPI document
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MicroserviceConfig {
    /// Routing key: the path segment selecting this service
    #[serde(default)]
    pub endpoint: String,

    /// Base URL, expected to end with `/`
    pub url: String,

    /// Optional display name used when the spec carries no title
    #[serde(default)]
    pub name: Option<String>,
}

impl MicroserviceConfig {
    pub fn new(endpoint: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            url: url.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn has_trailing_slash(&self) -> bool {
        self.url.ends_with('/')
    }
}

/// Values supplied on the command line. `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config_file: Option<PathBuf>,
    pub log_level: Option<String>,
    pub address: Option<String>,
    pub port: Option<u16>,
    pub api_specs_path: Option<String>,
}

/// Raw layered settings as they appear in the file and environment.
///
/// Multi-word keys are camelCase in the file. Aliases cover the lowercased
/// and snake_case spellings; only one spelling ever reaches serde because
/// the environment layer for these keys goes through [`EnvSetting`].
#[derive(Debug, Deserialize)]
struct Settings {
    #[serde(default = "default_host")]
    host: String,

    #[serde(default = "default_port")]
    port: u16,

    #[serde(default = "default_address")]
    address: String,

    #[serde(
        default = "default_api_specs_path",
        rename = "apiSpecsPath",
        alias = "apispecspath",
        alias = "api_specs_path"
    )]
    api_specs_path: String,

    #[serde(
        default = "default_log_level",
        rename = "logLevel",
        alias = "loglevel",
        alias = "log_level"
    )]
    log_level: String,

    #[serde(
        default = "default_timeout_secs",
        rename = "readTimeoutSecs",
        alias = "readtimeoutsecs",
        alias = "read_timeout_secs"
    )]
    read_timeout_secs: u64,

    #[serde(
        default = "default_timeout_secs",
        rename = "disconnectTimeoutSecs",
        alias = "disconnecttimeoutsecs",
        alias = "disconnect_timeout_secs"
    )]
    disconnect_timeout_secs: u64,

    #[serde(default)]
    services: Vec<MicroserviceConfig>,

    #[serde(default)]
    headers: HeaderSet,
}

impl Settings {
    fn apply_env(&mut self, setting: EnvSetting, var: &str, value: &str) -> Result<()> {
        match setting {
            EnvSetting::ApiSpecsPath => self.api_specs_path = value.to_string(),
            EnvSetting::LogLevel => self.log_level = value.to_string(),
            EnvSetting::ReadTimeout => self.read_timeout_secs = parse_secs(var, value)?,
            EnvSetting::DisconnectTimeout => {
                self.disconnect_timeout_secs = parse_secs(var, value)?
            }
        }
        Ok(())
    }
}

/// Settings with a multi-word key. The `config` environment source would
/// store `OASBINDER_APISPECSPATH` as `apispecspath` next to the file's
/// `apiSpecsPath`, so these variables are applied after the merge instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnvSetting {
    ApiSpecsPath,
    LogLevel,
    ReadTimeout,
    DisconnectTimeout,
}

impl EnvSetting {
    /// Match a variable name with the prefix already stripped. Underscores
    /// are optional: `API_SPECS_PATH` and `APISPECSPATH` are the same setting.
    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix.replace('_', "").to_ascii_lowercase().as_str() {
            "apispecspath" => Some(Self::ApiSpecsPath),
            "loglevel" => Some(Self::LogLevel),
            "readtimeoutsecs" => Some(Self::ReadTimeout),
            "disconnecttimeoutsecs" => Some(Self::DisconnectTimeout),
            _ => None,
        }
    }
}

fn parse_secs(var: &str, value: &str) -> Result<u64> {
    value.trim().parse().map_err(|_| {
        Error::config(format!(
            "{} must be a number of seconds, got '{}'",
            var, value
        ))
    })
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_address() -> String {
    DEFAULT_ADDRESS.to_string()
}

fn default_api_specs_path() -> String {
    DEFAULT_API_SPECS_PATH.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// `$HOME/.oasbinder.yaml`, if a home directory is known
pub fn default_config_path() -> Option<PathBuf> {
    env::var_os("HOME").map(|home| PathBuf::from(home).join(DEFAULT_CONFIG_FILE_NAME))
}

impl Config {
    /// Load configuration from file, environment and command-line overrides
    ///
    /// An explicitly named config file must exist; the default one in the
    /// home directory is optional.
    pub fn load(overrides: &Overrides) -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        match &overrides.config_file {
            Some(path) => Self::from_sources(Some(path), true, overrides),
            None => Self::from_sources(default_config_path().as_deref(), false, overrides),
        }
    }

    /// Build the configuration from an optional YAML file, the process
    /// environment and the given overrides, then validate it
    pub fn from_sources(file: Option<&Path>, required: bool, overrides: &Overrides) -> Result<Self> {
        Self::from_layers(file, required, env::vars(), overrides)
    }

    /// Same as [`Config::from_sources`] with an explicit set of environment
    /// variables in place of the process environment
    pub fn from_layers<I>(
        file: Option<&Path>,
        required: bool,
        vars: I,
        overrides: &Overrides,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let prefix = format!("{}_", ENV_PREFIX);
        let mut plain = config::Map::new();
        let mut multi_word = BTreeMap::new();
        for (name, value) in vars {
            let upper = name.to_ascii_uppercase();
            let Some(suffix) = upper.strip_prefix(&prefix) else {
                continue;
            };
            match EnvSetting::from_suffix(suffix) {
                Some(setting) => {
                    multi_word.insert(name, (setting, value));
                }
                None => {
                    plain.insert(name, value);
                }
            }
        }

        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Yaml)
                    .required(required),
            );
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .source(Some(plain))
                .try_parsing(true),
        );

        let mut settings: Settings = builder.build()?.try_deserialize()?;
        for (name, (setting, value)) in &multi_word {
            settings.apply_env(*setting, name, value)?;
        }

        let config = Self::from_settings(settings, overrides)?;
        config.validate()?;
        Ok(config)
    }

    fn from_settings(settings: Settings, overrides: &Overrides) -> Result<Self> {
        let services = settings
            .services
            .into_iter()
            .enumerate()
            .map(|(index, service)| normalize_service(index, service))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            server: ServerConfig {
                host: settings.host,
                port: overrides.port.unwrap_or(settings.port),
                read_timeout_secs: settings.read_timeout_secs,
                disconnect_timeout_secs: settings.disconnect_timeout_secs,
                log_level: overrides
                    .log_level
                    .clone()
                    .unwrap_or(settings.log_level),
            },
            gateway: GatewayConfig {
                services,
                headers: settings.headers,
                api_specs_path: overrides
                    .api_specs_path
                    .clone()
                    .unwrap_or(settings.api_specs_path),
                address: overrides.address.clone().unwrap_or(settings.address),
            },
        })
    }

    /// Reject configurations the gateway cannot serve
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::config("port must be non-zero"));
        }

        let address = &self.gateway.address;
        if !address.starts_with("http://") && !address.starts_with("https://") {
            return Err(Error::config(format!(
                "address '{}' must have the format http[s]://hostname[:port]",
                address
            )));
        }

        if self.gateway.api_specs_path.is_empty() {
            return Err(Error::config("apiSpecsPath cannot be empty"));
        }

        let mut seen = HashSet::new();
        for service in &self.gateway.services {
            if service.url.is_empty() {
                return Err(Error::config(format!(
                    "service '{}' has an empty url",
                    service.endpoint
                )));
            }
            if !seen.insert(service.endpoint.as_str()) {
                return Err(Error::config(format!(
                    "duplicate routing key '{}'",
                    service.endpoint
                )));
            }
        }

        Ok(())
    }

    /// Log the effective configuration at startup. Header values are never logged.
    pub fn log_summary(&self) {
        tracing::info!(
            address = %self.gateway.address,
            bind = %self.server.bind_address(),
            api_specs_path = %self.gateway.api_specs_path,
            log_level = %self.server.log_level,
            services = self.gateway.services.len(),
            "Configuration loaded"
        );

        if !self.gateway.headers.is_empty() {
            let names: Vec<&str> = self.gateway.headers.keys().map(String::as_str).collect();
            tracing::info!(headers = ?names, "Extra headers configured for spec requests");
        }

        for service in &self.gateway.services {
            if service.has_trailing_slash() {
                tracing::debug!(endpoint = %service.endpoint, url = %service.url, "Microservice configured");
            } else {
                tracing::warn!(
                    endpoint = %service.endpoint,
                    url = %service.url,
                    "Microservice URL has no trailing '/'; its spec cannot be fetched"
                );
            }
        }
    }
}

/// Older config files only carry `name`; treat it as the routing key then.
fn normalize_service(index: usize, mut service: MicroserviceConfig) -> Result<MicroserviceConfig> {
    if service.endpoint.is_empty() {
        match service.name.take() {
            Some(name) if !name.is_empty() => service.endpoint = name,
            _ => {
                return Err(Error::config(format!(
                    "service #{} needs an endpoint (or name)",
                    index + 1
                )))
            }
        }
    }
    Ok(service)
}
