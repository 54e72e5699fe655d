//! Command-line and environment configuration.
//!
//! Values are layered with the `config` crate: built-in defaults, then
//! command-line flags, then `SUPERVISORD_EXPORTER_*` environment variables.
//! A set environment variable always wins over the matching flag.

use std::time::Duration;

use clap::Parser;
use config::{Config, Environment, Map};
use serde::Deserialize;

/// Prefix for environment overrides, e.g. `SUPERVISORD_EXPORTER_METRICS_PATH`.
pub const ENV_PREFIX: &str = "SUPERVISORD_EXPORTER";

pub const DEFAULT_SUPERVISORD_URL: &str = "http://localhost:9001/RPC2";
pub const DEFAULT_LISTEN_ADDRESS: &str = ":9101";
pub const DEFAULT_METRICS_PATH: &str = "/metrics";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Parser, Debug, Default)]
#[command(name = "supervisor-exporter")]
#[command(about = "Prometheus exporter for supervisord process states")]
#[command(version)]
pub struct Args {
    /// supervisord XML-RPC endpoint [default: http://localhost:9001/RPC2]
    #[arg(long)]
    pub supervisord_url: Option<String>,

    /// Address to serve metrics on; an empty host listens on all interfaces [default: :9101]
    #[arg(long)]
    pub listen_address: Option<String>,

    /// Path under which metrics are exposed [default: /metrics]
    #[arg(long)]
    pub metrics_path: Option<String>,

    /// Upstream request timeout in seconds [default: 10]
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Prefix prepended to every metric name
    #[arg(long)]
    pub namespace: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Source(#[from] config::ConfigError),

    #[error("metrics path must start with '/': {0:?}")]
    InvalidMetricsPath(String),

    #[error("timeout must be greater than zero")]
    InvalidTimeout,

    #[error("invalid metric namespace: {0:?}")]
    InvalidNamespace(String),

    #[error("invalid listen address (expected [host]:port): {0:?}")]
    InvalidListenAddress(String),
}

/// Resolved exporter settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExporterConfig {
    pub supervisord_url: String,
    pub listen_address: String,
    pub metrics_path: String,
    /// Upstream timeout in whole seconds.
    pub timeout: u64,
    #[serde(default)]
    pub namespace: Option<String>,
}

impl ExporterConfig {
    /// Load from `args` and the process environment.
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        Self::load_from(args, None)
    }

    /// Load from `args` and an explicit environment map.
    ///
    /// `None` reads the process environment.
    pub fn load_from(args: &Args, env: Option<Map<String, String>>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("supervisord_url", DEFAULT_SUPERVISORD_URL)?
            .set_default("listen_address", DEFAULT_LISTEN_ADDRESS)?
            .set_default("metrics_path", DEFAULT_METRICS_PATH)?
            .set_default("timeout", DEFAULT_TIMEOUT_SECS)?;

        // Flags replace the defaults but stay below the environment.
        if let Some(url) = &args.supervisord_url {
            builder = builder.set_default("supervisord_url", url.as_str())?;
        }
        if let Some(addr) = &args.listen_address {
            builder = builder.set_default("listen_address", addr.as_str())?;
        }
        if let Some(path) = &args.metrics_path {
            builder = builder.set_default("metrics_path", path.as_str())?;
        }
        if let Some(timeout) = args.timeout {
            builder = builder.set_default("timeout", timeout)?;
        }
        if let Some(namespace) = &args.namespace {
            builder = builder.set_default("namespace", namespace.as_str())?;
        }

        let config: ExporterConfig = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .ignore_empty(true)
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize()?;

        config.normalized().validate()
    }

    fn normalized(mut self) -> Self {
        if self.namespace.as_deref().is_some_and(str::is_empty) {
            self.namespace = None;
        }
        self
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if !self.metrics_path.starts_with('/') {
            return Err(ConfigError::InvalidMetricsPath(self.metrics_path));
        }
        if self.timeout == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        if let Some(namespace) = &self.namespace {
            if !is_valid_namespace(namespace) {
                return Err(ConfigError::InvalidNamespace(namespace.clone()));
            }
        }
        split_listen_address(&self.listen_address)
            .ok_or_else(|| ConfigError::InvalidListenAddress(self.listen_address.clone()))?;
        Ok(self)
    }

    /// Bindable `host:port`. An empty host becomes `0.0.0.0`.
    pub fn listen_addr(&self) -> String {
        match split_listen_address(&self.listen_address) {
            Some(("", port)) => format!("0.0.0.0:{}", port),
            _ => self.listen_address.clone(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

fn split_listen_address(addr: &str) -> Option<(&str, u16)> {
    let (host, port) = addr.rsplit_once(':')?;
    Some((host, port.parse().ok()?))
}

/// Metric name prefixes follow the Prometheus metric name grammar.
fn is_valid_namespace(namespace: &str) -> bool {
    let mut chars = namespace.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}
