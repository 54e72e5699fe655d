//! HTTP listener serving the scrape endpoint.
//!
//! Each connection is served on its own task. A `GET` on the metrics path
//! runs one full refresh before answering; every other path is a 404.

use std::convert::Infallible;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, warn};

use crate::exporter::Exporter;
use crate::publisher;

/// A bound scrape endpoint, ready to serve.
#[derive(Debug)]
pub struct MetricsServer {
    listener: TcpListener,
    metrics_path: Arc<str>,
    exporter: Arc<Exporter>,
}

impl MetricsServer {
    /// Bind the listener. `addr` is a `host:port` string.
    pub async fn bind(
        addr: &str,
        metrics_path: &str,
        exporter: Arc<Exporter>,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            metrics_path: Arc::from(metrics_path),
            exporter,
        })
    }

    /// The address actually bound (useful with port 0).
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until `shutdown` resolves.
    ///
    /// Connections already accepted finish on their own tasks.
    pub async fn run<F>(self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let (stream, peer) = tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        accept_failed(&e).await;
                        continue;
                    }
                },
                _ = &mut shutdown => return Ok(()),
            };

            let io = TokioIo::new(stream);
            let metrics_path = self.metrics_path.clone();
            let exporter = self.exporter.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                    let metrics_path = metrics_path.clone();
                    let exporter = exporter.clone();

                    async move { handle_request(req, &metrics_path, &exporter).await }
                });

                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    debug!(%peer, error = %e, "scrape connection error");
                }
            });
        }
    }
}

/// Pause after a failed accept. Errors such as EMFILE persist until some
/// connection closes.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

async fn accept_failed(error: &io::Error) {
    warn!(error = %error, "failed to accept connection");
    tokio::time::sleep(ACCEPT_BACKOFF).await;
}

async fn handle_request<B>(
    req: Request<B>,
    metrics_path: &str,
    exporter: &Exporter,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let (parts, _body) = req.into_parts();
    Ok(respond(&parts.method, parts.uri.path(), metrics_path, exporter).await)
}

/// Route one request.
///
/// Only the metrics path exists. It answers `GET` with a fresh scrape and any
/// other method with 501; all other paths are 404.
pub async fn respond(
    method: &Method,
    path: &str,
    metrics_path: &str,
    exporter: &Exporter,
) -> Response<Full<Bytes>> {
    if path != metrics_path {
        return text_response(StatusCode::NOT_FOUND, "text/plain", "Not Found");
    }

    if *method != Method::GET {
        return text_response(
            StatusCode::NOT_IMPLEMENTED,
            "text/plain",
            "Not Implemented",
        );
    }

    let body = exporter.scrape().await;
    text_response(StatusCode::OK, publisher::CONTENT_TYPE, body)
}

fn text_response(
    status: StatusCode,
    content_type: &'static str,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}
