//! Request/response relay to the upstream device.
//!
//! # Lifecycle
//! ```text
//! Idle → Connecting → ForwardingRequest → ForwardingResponse → Done
//!          │                 │
//!          └─────────────────┴──→ Failed (502, no retry)
//! ```
//!
//! # Design Decisions
//! - Bodies are never buffered: the inbound body is handed to the client as a
//!   stream and the upstream `Incoming` body is handed back the same way
//! - A failure once the response is streaming truncates it; nothing is retried
//! - Dropping the `forward` future (caller went away) drops the pending client
//!   request, which closes the upstream connection
//! - `request_secs` bounds silence, not the whole exchange: the deadline is
//!   pushed back every time an upload chunk reaches the device, and once the
//!   upload is finished it bounds the wait for the response head

use std::fmt;
use std::task::Poll;
use std::time::Duration;

use axum::body::{Body, HttpBody};
use axum::http::{header, HeaderValue, Request, Version};
use axum::response::Response;
use futures_util::{stream, StreamExt};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};

use crate::config::TimeoutConfig;
use crate::proxy::error::RelayError;
use crate::proxy::upstream::UpstreamTarget;

/// Where a relayed exchange currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayPhase {
    Idle,
    Connecting,
    ForwardingRequest,
    ForwardingResponse,
    Done,
}

impl fmt::Display for RelayPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RelayPhase::Idle => "idle",
            RelayPhase::Connecting => "connecting",
            RelayPhase::ForwardingRequest => "forwarding_request",
            RelayPhase::ForwardingResponse => "forwarding_response",
            RelayPhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Forwards whole requests to the upstream device.
#[derive(Clone)]
pub struct ProxyRelay {
    client: Client<HttpConnector, Body>,
    upstream: UpstreamTarget,
    request_timeout: Duration,
    preserve_host: bool,
}

impl ProxyRelay {
    /// Create a relay with its own connection pool.
    pub fn new(upstream: UpstreamTarget, timeouts: &TimeoutConfig, preserve_host: bool) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));

        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            client,
            upstream,
            request_timeout: Duration::from_secs(timeouts.request_secs),
            preserve_host,
        }
    }

    pub fn upstream(&self) -> &UpstreamTarget {
        &self.upstream
    }

    /// Forward one request and return the upstream response with its body
    /// still streaming.
    pub async fn forward(&self, request: Request<Body>) -> Result<Response, RelayError> {
        let started = Instant::now();
        let request = self.prepare(request)?;
        let method = request.method().clone();
        let uri = request.uri().clone();

        tracing::debug!(
            phase = %RelayPhase::Connecting,
            method = %method,
            upstream = %uri,
            "Relaying request"
        );

        let (parts, body) = request.into_parts();
        let (progress_tx, mut progress_rx) = watch::channel(0u64);
        let body = if body.is_end_stream() {
            drop(progress_tx);
            body
        } else {
            track_upload(body, progress_tx)
        };

        let exchange = self.client.request(Request::from_parts(parts, body));
        tokio::pin!(exchange);

        let mut uploading = true;
        let mut deadline = Instant::now() + self.request_timeout;
        let result = loop {
            tokio::select! {
                result = &mut exchange => break result,
                changed = progress_rx.changed(), if uploading => {
                    if changed.is_err() {
                        uploading = false;
                        tracing::trace!(
                            phase = %RelayPhase::ForwardingRequest,
                            sent = *progress_rx.borrow(),
                            "Request body sent"
                        );
                    }
                    deadline = Instant::now() + self.request_timeout;
                }
                () = sleep_until(deadline) => {
                    return Err(RelayError::Timeout(self.request_timeout));
                }
            }
        };

        let response = match result {
            Ok(response) => response,
            Err(e) if e.is_connect() => return Err(RelayError::Connect(e)),
            Err(e) => return Err(RelayError::Exchange(e)),
        };

        tracing::debug!(
            phase = %RelayPhase::ForwardingResponse,
            method = %method,
            upstream = %uri,
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Upstream response head received"
        );

        let (parts, body) = response.into_parts();
        Ok(Response::from_parts(parts, Body::new(body)))
    }

    /// Point the inbound request at the upstream.
    fn prepare(&self, request: Request<Body>) -> Result<Request<Body>, RelayError> {
        let (mut parts, body) = request.into_parts();

        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let uri = self
            .upstream
            .request_uri(path_and_query)
            .map_err(|e| RelayError::InvalidTarget(e.to_string()))?;

        parts.uri = uri;
        parts.version = Version::HTTP_11;

        if !self.preserve_host {
            let host = HeaderValue::from_str(self.upstream.authority())
                .map_err(|e| RelayError::InvalidTarget(e.to_string()))?;
            parts.headers.insert(header::HOST, host);
        }

        Ok(Request::from_parts(parts, body))
    }
}

/// Wrap an outbound body so `progress` counts the bytes handed to the client.
/// The sender is dropped once the body ends, which closes the channel.
fn track_upload(body: Body, progress: watch::Sender<u64>) -> Body {
    let mut chunks = body.into_data_stream();
    let mut progress = Some(progress);

    Body::from_stream(stream::poll_fn(move |cx| {
        let poll = chunks.poll_next_unpin(cx);
        match &poll {
            Poll::Ready(Some(Ok(chunk))) => {
                if let Some(progress) = &progress {
                    progress.send_modify(|sent| *sent += chunk.len() as u64);
                }
            }
            Poll::Ready(_) => drop(progress.take()),
            Poll::Pending => {}
        }
        poll
    }))
}
