//! The fixed upstream device.
//!
//! One target for the lifetime of the process: no discovery, no failover.
//! Redirects point the browser at it and the relay connects to it.

use axum::http::Uri;
use thiserror::Error;
use url::Url;

/// Error type for an unusable upstream base URL.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("invalid upstream URL: {0}")]
    Parse(#[from] url::ParseError),
    #[error("unsupported scheme '{0}' (only http is supported)")]
    Scheme(String),
    #[error("upstream URL has no host")]
    MissingHost,
    #[error("upstream URL must not carry a query or fragment")]
    Trailing,
}

/// Parsed upstream base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamTarget {
    /// Base URL, always ending in `/`.
    base: String,
    /// `host[:port]`, port omitted when it is 80.
    authority: String,
    /// Base path without the trailing `/` (empty for the root).
    path_prefix: String,
}

impl UpstreamTarget {
    /// Parse a base URL such as `http://192.168.10.216/`.
    pub fn parse(base_url: &str) -> Result<Self, UpstreamError> {
        let url = Url::parse(base_url)?;

        if url.scheme() != "http" {
            return Err(UpstreamError::Scheme(url.scheme().to_string()));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(UpstreamError::Trailing);
        }
        let host = url.host_str().ok_or(UpstreamError::MissingHost)?;

        // Url::port() is None for the scheme default (80).
        let authority = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        let path_prefix = url.path().trim_end_matches('/').to_string();
        let base = format!("http://{}{}/", authority, path_prefix);

        Ok(Self {
            base,
            authority,
            path_prefix,
        })
    }

    /// Base URL with a trailing slash.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// `host[:port]` used for the outbound connection and Host rewriting.
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Absolute URL for a redirect: base followed by `suffix` verbatim.
    ///
    /// No normalization or re-encoding happens; whatever the caller sent is
    /// what the browser is pointed at.
    pub fn location(&self, suffix: &str) -> String {
        let mut location = String::with_capacity(self.base.len() + suffix.len());
        location.push_str(&self.base);
        location.push_str(suffix.trim_start_matches('/'));
        location
    }

    /// Outbound request URI for an inbound path and query.
    pub fn request_uri(&self, path_and_query: &str) -> Result<Uri, axum::http::uri::InvalidUri> {
        format!("http://{}{}{}", self.authority, self.path_prefix, path_and_query).parse()
    }
}
