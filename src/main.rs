//! ESP device relay.
//!
//! # Architecture Overview
//!
//! ```text
//!     Browser                    ┌───────────────────────────────────────┐
//!     ───────────────────────────┼─▶ http server ─▶ routing table        │
//!                                │                    │                  │
//!                                │      ┌─────────────┼────────────┐     │
//!                                │      ▼             ▼            ▼     │
//!     ◀── 302 Location ──────────┼─ redirect     proxy relay   document  │
//!                                │                    │          root    │
//!     ◀── relayed response ──────┼────────────────────┘                  │      ESP
//!                                │                    └──────────────────┼───▶ device
//!                                └───────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use esp_relay::config::{read_config, validate_config, ConfigError, RelayConfig};
use esp_relay::lifecycle::{signals, Shutdown};
use esp_relay::observability::{logging, metrics};
use esp_relay::HttpServer;

#[derive(Parser, Debug)]
#[command(name = "esp-relay")]
#[command(about = "Web front-end that redirects and relays requests to an ESP show controller", long_about = None)]
struct Cli {
    /// TOML configuration file; built-in defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, e.g. 0.0.0.0:9000.
    #[arg(long)]
    bind: Option<String>,

    /// Upstream device base URL, e.g. http://192.168.10.216/.
    #[arg(long)]
    upstream: Option<String>,

    /// Directory served for unmatched GET requests.
    #[arg(long)]
    static_root: Option<String>,

    /// Do not register the /file/* reverse proxy.
    #[arg(long)]
    no_file_proxy: bool,

    /// Forward the caller's Host header to the device unchanged.
    #[arg(long)]
    preserve_host: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn apply(&self, config: &mut RelayConfig) {
        if let Some(bind) = &self.bind {
            config.listener.bind_address = bind.clone();
        }
        if let Some(upstream) = &self.upstream {
            config.upstream.base_url = upstream.clone();
        }
        if let Some(root) = &self.static_root {
            config.static_files.root = root.clone();
        }
        if self.no_file_proxy {
            config.file_proxy.enabled = false;
        }
        if self.preserve_host {
            config.file_proxy.preserve_host = true;
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => read_config(path)?,
        None => RelayConfig::default(),
    };
    cli.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init(&config.observability.log_level);

    tracing::info!("esp-relay v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.base_url,
        connect_timeout_secs = config.timeouts.connect_secs,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        // Validated above.
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config)?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_file_values() {
        let cli = Cli::parse_from([
            "esp-relay",
            "--bind",
            "127.0.0.1:9100",
            "--upstream",
            "http://10.1.1.2/",
            "--no-file-proxy",
            "--preserve-host",
        ]);
        let mut config = RelayConfig::default();
        cli.apply(&mut config);

        assert_eq!(config.listener.bind_address, "127.0.0.1:9100");
        assert_eq!(config.upstream.base_url, "http://10.1.1.2/");
        assert!(!config.file_proxy.enabled);
        assert!(config.file_proxy.preserve_host);
        assert_eq!(config.static_files.root, "html");
    }
}
