//! ESP device relay library.
//!
//! Fronts a lighting/show controller on the local network: device command
//! endpoints are answered with redirects to the device, `/file/*` is relayed
//! through this server, everything else is served from a local document root.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod routing;

pub use config::schema::RelayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
