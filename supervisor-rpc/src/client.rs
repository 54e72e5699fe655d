//! supervisord client using the XML-RPC control API.
//!
//! supervisord exposes its control API on the `[inet_http_server]` endpoint,
//! typically `http://localhost:9001/RPC2`. This client issues exactly one
//! `supervisor.getAllProcessInfo` call per [`ProcessSource::fetch`], with no
//! retry or backoff.
//!
//! ## Example
//!
//! ```rust,no_run
//! use supervisor_rpc::{ProcessSource, SupervisordClient};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = SupervisordClient::builder()
//!         .endpoint("http://localhost:9001/RPC2")
//!         .timeout(Duration::from_secs(5))
//!         .build()?;
//!
//!     for record in client.fetch().await? {
//!         println!("{}:{} state={}", record.group, record.name, record.state);
//!     }
//!
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use supervisor_types::RawProcessRecord;

use crate::xmlrpc::{self, DecodeOutcome, Value};
use crate::{UpstreamError, XmlRpcError};

/// Default control API endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:9001/RPC2";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const GET_ALL_PROCESS_INFO: &str = "supervisor.getAllProcessInfo";

/// A source of raw process records.
///
/// Implemented by [`SupervisordClient`]; tests substitute their own.
#[async_trait]
pub trait ProcessSource: Send + Sync {
    /// Fetch every process record the daemon currently reports.
    async fn fetch(&self) -> Result<Vec<RawProcessRecord>, UpstreamError>;

    /// Human-readable description of where records come from.
    fn description(&self) -> &str;
}

#[async_trait]
impl<S: ProcessSource + ?Sized> ProcessSource for Arc<S> {
    async fn fetch(&self) -> Result<Vec<RawProcessRecord>, UpstreamError> {
        self.as_ref().fetch().await
    }

    fn description(&self) -> &str {
        self.as_ref().description()
    }
}

/// Client for one supervisord control endpoint.
#[derive(Debug, Clone)]
pub struct SupervisordClient {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl SupervisordClient {
    /// Create a new builder for configuring the client.
    pub fn builder() -> SupervisordClientBuilder {
        SupervisordClientBuilder::default()
    }

    /// The configured endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The configured request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn call(&self, method: &str) -> Result<Value, UpstreamError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "text/xml")
            .body(xmlrpc::encode_call(method))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(UpstreamError::Http(response.status().as_u16()));
        }

        let body = response.text().await?;
        match xmlrpc::decode_response(&body)? {
            DecodeOutcome::Success(value) => Ok(value),
            DecodeOutcome::Fault { code, message } => Err(UpstreamError::Fault { code, message }),
        }
    }
}

#[async_trait]
impl ProcessSource for SupervisordClient {
    async fn fetch(&self) -> Result<Vec<RawProcessRecord>, UpstreamError> {
        let value = self.call(GET_ALL_PROCESS_INFO).await?;
        let records = process_records(value)?;
        debug!(
            endpoint = %self.endpoint,
            records = records.len(),
            "fetched process info"
        );
        Ok(records)
    }

    fn description(&self) -> &str {
        &self.endpoint
    }
}

/// Builder for SupervisordClient.
#[derive(Debug, Default)]
pub struct SupervisordClientBuilder {
    endpoint: Option<String>,
    timeout: Option<Duration>,
}

impl SupervisordClientBuilder {
    /// Set the control API URL (e.g., "http://localhost:9001/RPC2").
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the request timeout (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<SupervisordClient, UpstreamError> {
        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);

        let client = Client::builder().timeout(timeout).build()?;

        Ok(SupervisordClient {
            client,
            endpoint: self
                .endpoint
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            timeout,
        })
    }
}

/// Convert a `getAllProcessInfo` result into process records.
///
/// The result must be an array. Entries that are not structs, or that lack one
/// of `name`, `group`, `state`, `start` with the right type, are skipped with a
/// warning rather than failing the whole poll.
pub fn process_records(value: Value) -> Result<Vec<RawProcessRecord>, XmlRpcError> {
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(XmlRpcError::Shape(format!(
                "getAllProcessInfo returned {}, expected array",
                other.kind()
            )))
        }
    };

    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match record_from_value(&item) {
            Ok(record) => records.push(record),
            Err(reason) => warn!(index, %reason, "skipping malformed process record"),
        }
    }

    Ok(records)
}

fn record_from_value(value: &Value) -> Result<RawProcessRecord, String> {
    let Value::Struct(members) = value else {
        return Err(format!("entry is {}, expected struct", value.kind()));
    };

    let string_field = |key: &str| -> Result<String, String> {
        match members.get(key) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Err(format!("field {:?} is {}, expected string", key, other.kind())),
            None => Err(format!("missing field {:?}", key)),
        }
    };
    let int_field = |key: &str| -> Result<i64, String> {
        match members.get(key) {
            Some(Value::Int(i)) => Ok(*i),
            Some(other) => Err(format!("field {:?} is {}, expected int", key, other.kind())),
            None => Err(format!("missing field {:?}", key)),
        }
    };

    let mut record = RawProcessRecord::new(
        string_field("name")?,
        string_field("group")?,
        int_field("state")?,
        int_field("start")?,
    );
    record.statename = members.get("statename").and_then(Value::as_str).map(str::to_string);
    record.pid = members.get("pid").and_then(Value::as_i64);
    record.description = members
        .get("description")
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(record)
}
