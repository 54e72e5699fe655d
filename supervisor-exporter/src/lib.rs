//! # supervisor-exporter
//!
//! Republishes supervisord process states as Prometheus gauges.
//!
//! Every scrape of the metrics path runs one full cycle:
//!
//! ```text
//!  GET /metrics
//!       │
//!       ▼
//!  ┌──────────┐   ┌───────────┐   ┌─────────┐   ┌───────────┐
//!  │  fetch   │──▶│ reconcile │──▶│  count  │──▶│  publish  │──▶ response body
//!  │ (XML-RPC)│   │ (dedupe)  │   │ (states)│   │ (snapshot)│
//!  └──────────┘   └───────────┘   └─────────┘   └───────────┘
//! ```
//!
//! - **[`reconcile`]**: collapses duplicate records to one per `(group, name)`
//!   and counts them per [`SemanticState`](supervisor_types::SemanticState)
//! - **[`publisher`]**: holds the current snapshot and renders the text
//!   exposition format
//! - **[`exporter`]**: ties a [`ProcessSource`](supervisor_rpc::ProcessSource)
//!   to a [`Publisher`]
//! - **[`server`]**: the hyper scrape endpoint
//! - **[`config`]**: flags and `SUPERVISORD_EXPORTER_*` environment variables
//!
//! ## Usage
//!
//! ```bash
//! supervisor-exporter --supervisord-url http://localhost:9001/RPC2 --listen-address :9101
//! ```
//!
//! ### As a library
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use supervisor_exporter::{Exporter, MetricsServer, Publisher};
//! use supervisor_rpc::SupervisordClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = SupervisordClient::builder()
//!         .endpoint("http://localhost:9001/RPC2")
//!         .build()?;
//!     let exporter = Arc::new(Exporter::new(client, Publisher::default()));
//!
//!     let server = MetricsServer::bind("0.0.0.0:9101", "/metrics", exporter).await?;
//!     server.run(async { let _ = tokio::signal::ctrl_c().await; }).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod exporter;
pub mod publisher;
pub mod reconcile;
pub mod server;

pub use config::{Args, ConfigError, ExporterConfig};
pub use exporter::{poll, Exporter};
pub use publisher::{format_prometheus, Publisher};
pub use reconcile::{count, reconcile, ResolvedRecords};
pub use server::MetricsServer;
