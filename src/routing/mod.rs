//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path, query)
//!     → router.rs (route lookup)
//!     → matcher.rs (evaluate method set and path pattern)
//!     → Return: matched Route (+ captured segment) or NoMatch
//!
//! Matched Redirect route:
//!     → redirect.rs (upstream base + suffix → 302 Location)
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path
//! - Deterministic: same input always matches same route

pub mod matcher;
pub mod redirect;
pub mod router;

pub use matcher::{MethodSet, PathPattern, PatternError};
pub use redirect::{redirect_response, RedirectTarget};
pub use router::{Route, RouteAction, RouteError, RouteMatch, RouteTable};
