//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace span)
//!     → [routing table decides: redirect | relay | static | 404]
//!     → Send to client
//! ```

pub mod request;
pub mod server;

pub use request::{request_id, MakeRelayRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer, ServerError};
