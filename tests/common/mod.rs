//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use futures_util::stream;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use esp_relay::config::RelayConfig;
use esp_relay::{HttpServer, Shutdown};

/// Payload the mock device serves for `/file/foo.bin`.
pub const FOO_BIN: &[u8] = b"\x00\x01FSEQ\x02\xffpayload";

const BIG_CHUNK: usize = 64 * 1024;
const BIG_CHUNKS: usize = 64;

/// Payload the mock device streams for `/file/big.bin`: 4 MiB, chunked.
#[allow(dead_code)]
pub fn big_bin() -> Vec<u8> {
    (0..BIG_CHUNKS).flat_map(big_chunk).collect()
}

fn big_chunk(index: usize) -> Vec<u8> {
    vec![(index % 251) as u8; BIG_CHUNK]
}

/// Start a mock ESP device on an ephemeral port.
///
/// - `/file/foo.bin`: fixed binary payload with device headers
/// - `/file/missing.bin`: 404
/// - `/file/slow.bin`: answers after two seconds
/// - `/file/big.bin`: [`big_bin`] as a chunked stream
/// - anything else: echoes method, URI, Host, body length and request ID
pub async fn start_mock_device() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().fallback(device);

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    addr
}

async fn device(request: Request<Body>) -> Response {
    match request.uri().path() {
        "/file/foo.bin" => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "application/octet-stream"),
                (header::HeaderName::from_static("x-device"), "espixelstick"),
            ],
            FOO_BIN,
        )
            .into_response(),
        "/file/missing.bin" => (StatusCode::NOT_FOUND, "no such file").into_response(),
        "/file/slow.bin" => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            "slow".into_response()
        }
        "/file/big.bin" => {
            let chunks = stream::iter(
                (0..BIG_CHUNKS).map(|i| Ok::<_, std::io::Error>(big_chunk(i))),
            );
            Body::from_stream(chunks).into_response()
        }
        _ => {
            let method = request.method().clone();
            let uri = request.uri().clone();
            let host = header_text(&request, "host");
            let request_id = header_text(&request, "x-request-id");
            let body = axum::body::to_bytes(request.into_body(), usize::MAX)
                .await
                .unwrap_or_default();
            format!(
                "{} {} host={} len={} rid={}",
                method,
                uri,
                host,
                body.len(),
                request_id
            )
            .into_response()
        }
    }
}

/// Sends `"dropped"` when the handler holding it goes away.
struct DropSignal(mpsc::UnboundedSender<&'static str>);

impl Drop for DropSignal {
    fn drop(&mut self) {
        let _ = self.0.send("dropped");
    }
}

/// Start a device that accepts every request and never answers.
///
/// The receiver yields `"started"` when a handler begins and `"dropped"` when
/// its connection goes away and the handler is cancelled.
#[allow(dead_code)]
pub async fn start_hanging_device() -> (SocketAddr, mpsc::UnboundedReceiver<&'static str>) {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().fallback(move || {
        let events = events_tx.clone();
        async move {
            let _ = events.send("started");
            let _signal = DropSignal(events);
            std::future::pending::<()>().await;
            StatusCode::OK
        }
    });

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (addr, events_rx)
}

fn header_text(request: &Request<Body>, name: &str) -> String {
    request
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string()
}

/// Relay configuration pointing at `upstream`, with short timeouts.
pub fn relay_config(upstream: SocketAddr) -> RelayConfig {
    let mut config = RelayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.upstream.base_url = format!("http://{}/", upstream);
    config.timeouts.connect_secs = 1;
    config.timeouts.request_secs = 5;
    config
}

/// Start the relay on an ephemeral port. Keep the `Shutdown` alive for the
/// duration of the test.
pub async fn start_relay(config: RelayConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(config).unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

/// An address nothing is listening on.
#[allow(dead_code)]
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Client that reports redirects instead of following them.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}
