//! Upstream subsystem.
//!
//! # Data Flow
//! ```text
//! base URL (config)
//!     → upstream.rs (parse once into UpstreamTarget)
//!     → redirect locations (routing) and outbound URIs (relay.rs)
//!
//! /file/* request
//!     → relay.rs (rewrite URI + Host, stream body out, stream response back)
//!     → error.rs (502 / 500 on failure)
//! ```

pub mod error;
pub mod relay;
pub mod upstream;

pub use error::RelayError;
pub use relay::{ProxyRelay, RelayPhase};
pub use upstream::{UpstreamError, UpstreamTarget};
