//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Look up matching route for a method and path
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan in registration order (the table is a dozen entries)
//! - Ambiguous tables are rejected at construction, so first match is the
//!   only match
//! - Explicit NoMatch rather than silent default

use axum::http::Method;
use thiserror::Error;

use crate::routing::matcher::{MethodSet, PathPattern, PatternError};
use crate::routing::redirect::RedirectTarget;

/// Error type for building a route table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error(transparent)]
    Pattern(#[from] PatternError),
    #[error("routes '{first}' and '{second}' overlap on the same pattern and method")]
    Ambiguous { first: String, second: String },
    #[error("route '{0}' redirects with a captured segment but its pattern has no parameter")]
    MissingCapture(String),
}

/// What a matched route does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteAction {
    /// Send the browser to the device.
    Redirect(RedirectTarget),
    /// Relay the request through this server.
    Proxy,
}

/// One entry of the route table.
#[derive(Debug, Clone)]
pub struct Route {
    /// Route identifier for logging/metrics.
    pub name: String,
    pub methods: MethodSet,
    pub pattern: PathPattern,
    pub action: RouteAction,
}

impl Route {
    pub fn new(
        name: &str,
        methods: MethodSet,
        pattern: &str,
        action: RouteAction,
    ) -> Result<Self, RouteError> {
        let pattern = PathPattern::parse(pattern)?;
        if matches!(action, RouteAction::Redirect(RedirectTarget::Captured(_)))
            && pattern.param_name().is_none()
        {
            return Err(RouteError::MissingCapture(name.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            methods,
            pattern,
            action,
        })
    }
}

/// Result of a successful lookup.
#[derive(Debug, Clone, Copy)]
pub struct RouteMatch<'r, 'p> {
    pub route: &'r Route,
    /// Raw captured segment for `/conf/:file` style routes.
    pub capture: Option<&'p str>,
}

/// Frozen, ordered route table.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Freeze a list of routes, rejecting ambiguous combinations.
    pub fn new(routes: Vec<Route>) -> Result<Self, RouteError> {
        for (i, first) in routes.iter().enumerate() {
            for second in &routes[i + 1..] {
                if first.pattern == second.pattern && first.methods.intersects(&second.methods) {
                    return Err(RouteError::Ambiguous {
                        first: first.name.clone(),
                        second: second.name.clone(),
                    });
                }
            }
        }
        Ok(Self { routes })
    }

    /// The device's command endpoints, plus `/file/*` when the file proxy is on.
    pub fn device_routes(file_proxy: bool) -> Result<Self, RouteError> {
        use Method as M;

        let mut routes = vec![
            Route::new("xp", MethodSet::only(&[M::GET, M::POST]), "/XP", redirect("XP"))?,
            Route::new("x6", MethodSet::only(&[M::POST]), "/X6", redirect("X6"))?,
            Route::new("x7", MethodSet::only(&[M::POST]), "/X7", redirect("X7"))?,
            Route::new("xj", MethodSet::only(&[M::GET, M::POST]), "/XJ", redirect("XJ"))?,
            Route::new(
                "conf",
                MethodSet::only(&[M::GET, M::PUT]),
                "/conf/:file",
                RouteAction::Redirect(RedirectTarget::captured("conf/")),
            )?,
            Route::new(
                "settime",
                MethodSet::only(&[M::POST]),
                "/settime",
                RouteAction::Redirect(RedirectTarget::forward_query("settime", "newtime")),
            )?,
            Route::new(
                "fseqfilelist",
                MethodSet::only(&[M::GET]),
                "/fseqfilelist",
                redirect("fseqfilelist"),
            )?,
        ];

        if file_proxy {
            routes.push(Route::new("file", MethodSet::Any, "/file/*", RouteAction::Proxy)?);
        }

        Self::new(routes)
    }

    /// Find the route for a request. First match in registration order.
    pub fn lookup<'r, 'p>(&'r self, method: &Method, path: &'p str) -> Option<RouteMatch<'r, 'p>> {
        self.routes.iter().find_map(|route| {
            if !route.methods.contains(method) {
                return None;
            }
            route
                .pattern
                .matches(path)
                .map(|capture| RouteMatch { route, capture })
        })
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

fn redirect(suffix: &str) -> RouteAction {
    RouteAction::Redirect(RedirectTarget::fixed(suffix))
}
