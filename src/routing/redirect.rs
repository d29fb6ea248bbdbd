//! Redirect targets on the upstream device.
//!
//! A redirect tells the browser to re-issue its request directly against the
//! device. Locations are built textually from the upstream base so whatever
//! the browser sent (captured segment, query value) reaches the device
//! byte-for-byte.
//!
//! A forwarded query key that is absent from the request is sent with an
//! empty value: `/settime` without `newtime` redirects to
//! `settime?newtime=`, never to `settime?newtime=undefined`.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::proxy::UpstreamTarget;

/// Suffix appended to the upstream base for a redirect route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectTarget {
    /// Literal suffix, e.g. `XP`.
    Fixed(String),
    /// Prefix followed by the route's captured segment, e.g. `conf/` + file.
    Captured(String),
    /// `path?key=<value>` where the value comes from the inbound query.
    ForwardQuery { path: String, key: String },
}

impl RedirectTarget {
    pub fn fixed(suffix: &str) -> Self {
        RedirectTarget::Fixed(suffix.to_string())
    }

    pub fn captured(prefix: &str) -> Self {
        RedirectTarget::Captured(prefix.to_string())
    }

    pub fn forward_query(path: &str, key: &str) -> Self {
        RedirectTarget::ForwardQuery {
            path: path.to_string(),
            key: key.to_string(),
        }
    }

    /// Suffix for this request. A missing capture or query value becomes empty.
    pub fn suffix(&self, capture: Option<&str>, query: Option<&str>) -> String {
        match self {
            RedirectTarget::Fixed(suffix) => suffix.clone(),
            RedirectTarget::Captured(prefix) => format!("{}{}", prefix, capture.unwrap_or_default()),
            RedirectTarget::ForwardQuery { path, key } => {
                let value = query.and_then(|q| raw_query_value(q, key)).unwrap_or_default();
                format!("{}?{}={}", path, key, value)
            }
        }
    }

    /// Absolute location on the upstream.
    pub fn location(
        &self,
        upstream: &UpstreamTarget,
        capture: Option<&str>,
        query: Option<&str>,
    ) -> String {
        upstream.location(&self.suffix(capture, query))
    }
}

/// First value for `key` in a raw query string, without decoding.
pub fn raw_query_value<'a>(query: &'a str, key: &str) -> Option<&'a str> {
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
        (k == key).then_some(v)
    })
}

/// `302 Found` pointing at `location`, like Express's `res.redirect`.
///
/// `location` is assembled from an already-valid URI, so the header value
/// can only fail on bytes the inbound request could not have carried.
pub fn redirect_response(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        Err(e) => {
            tracing::error!(location = %location, error = %e, "Redirect location is not a valid header");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
