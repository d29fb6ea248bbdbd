//! Route matching logic.
//!
//! # Responsibilities
//! - Match the request method against a set of allowed methods
//! - Match the path against an exact literal, a single named segment
//!   (`/conf/:file`) or a prefix wildcard (`/file/*`)
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Captured segments are returned raw (still percent-encoded)
//! - No regex to keep matching O(pattern length)

use axum::http::Method;
use thiserror::Error;

/// Error type for pattern strings that cannot be compiled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("pattern '{0}' must start with '/'")]
    NotAbsolute(String),
    #[error("pattern '{0}' has an empty parameter name")]
    EmptyParam(String),
    #[error("pattern '{0}' may only capture its last segment")]
    ParamNotLast(String),
    #[error("pattern '{0}' may only use '*' as its last segment")]
    WildcardNotLast(String),
}

/// Compiled path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    /// `/XP`: the whole path must be equal.
    Exact(String),
    /// `/conf/:file`: prefix followed by exactly one non-empty segment.
    Param { prefix: String, name: String },
    /// `/file/*`: anything starting with the prefix.
    Prefix(String),
}

impl PathPattern {
    /// Compile an Express-style pattern.
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        if !pattern.starts_with('/') {
            return Err(PatternError::NotAbsolute(pattern.to_string()));
        }

        let split = pattern.rfind('/').unwrap_or(0) + 1;
        let (prefix, last) = pattern.split_at(split);

        if prefix.contains("/:") {
            return Err(PatternError::ParamNotLast(pattern.to_string()));
        }
        if prefix.contains('*') {
            return Err(PatternError::WildcardNotLast(pattern.to_string()));
        }

        if let Some(name) = last.strip_prefix(':') {
            if name.is_empty() {
                return Err(PatternError::EmptyParam(pattern.to_string()));
            }
            return Ok(PathPattern::Param {
                prefix: prefix.to_string(),
                name: name.to_string(),
            });
        }

        if last == "*" {
            return Ok(PathPattern::Prefix(prefix.to_string()));
        }
        if last.contains('*') {
            return Err(PatternError::WildcardNotLast(pattern.to_string()));
        }

        Ok(PathPattern::Exact(pattern.to_string()))
    }

    /// Match a request path. `Some(capture)` on success, where `capture` is
    /// the raw named segment for `Param` patterns.
    pub fn matches<'a>(&self, path: &'a str) -> Option<Option<&'a str>> {
        match self {
            PathPattern::Exact(expected) => (path == expected).then_some(None),
            PathPattern::Param { prefix, .. } => {
                let segment = path.strip_prefix(prefix.as_str())?;
                if segment.is_empty() || segment.contains('/') {
                    return None;
                }
                Some(Some(segment))
            }
            PathPattern::Prefix(prefix) => path.starts_with(prefix.as_str()).then_some(None),
        }
    }

    /// Name of the captured segment, if any.
    pub fn param_name(&self) -> Option<&str> {
        match self {
            PathPattern::Param { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// Methods a route answers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodSet {
    Any,
    Only(Vec<Method>),
}

impl MethodSet {
    pub fn only(methods: &[Method]) -> Self {
        MethodSet::Only(methods.to_vec())
    }

    /// A set containing GET also answers HEAD.
    pub fn contains(&self, method: &Method) -> bool {
        match self {
            MethodSet::Any => true,
            MethodSet::Only(methods) => {
                methods.contains(method) || (*method == Method::HEAD && methods.contains(&Method::GET))
            }
        }
    }

    /// True if some method is accepted by both sets.
    pub fn intersects(&self, other: &MethodSet) -> bool {
        match (self, other) {
            (MethodSet::Any, _) | (_, MethodSet::Any) => true,
            (MethodSet::Only(a), MethodSet::Only(b)) => {
                a.iter().any(|m| other.contains(m)) || b.iter().any(|m| self.contains(m))
            }
        }
    }
}
