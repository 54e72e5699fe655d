//! # supervisor-rpc
//!
//! A minimal client for supervisord's XML-RPC control API, covering the one
//! call an exporter needs: `supervisor.getAllProcessInfo`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use supervisor_rpc::{ProcessSource, SupervisordClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = SupervisordClient::builder()
//!         .endpoint("http://localhost:9001/RPC2")
//!         .build()?;
//!
//!     let records = client.fetch().await?;
//!     println!("supervisord reports {} processes", records.len());
//!     Ok(())
//! }
//! ```
//!
//! Every failure (connection, timeout, HTTP status, malformed body, remote
//! fault) surfaces as an [`UpstreamError`].

pub mod client;
pub mod error;
pub mod xmlrpc;

pub use client::{ProcessSource, SupervisordClient, SupervisordClientBuilder};
pub use error::{UpstreamError, XmlRpcError};

// Re-export types for convenience
pub use supervisor_types::RawProcessRecord;
