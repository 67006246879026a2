//! Location normalization subsystem.
//!
//! # Data Flow
//! ```text
//! RawLocation ("/a?x=1", { name, params }, "../sibling")
//!     → path.rs (split path/query/hash, resolve relative paths)
//!     → query.rs (parse + merge query)
//!     → normalize.rs (named / relative-params / path targets)
//!     → Location (absolute, normalized)
//! ```
//!
//! # Design Decisions
//! - Inputs are never mutated; every call returns a fresh `Location`
//! - Relative resolution without a current route falls back to `/`
//! - Percent-decoding of path params happens in the matcher, not here

pub mod normalize;
pub mod path;
pub mod query;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use normalize::normalize;
pub use query::{Query, QueryValue};

/// Route parameters by name.
pub type Params = BTreeMap<String, String>;

/// A normalized navigation target, ready for matching.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Location {
    pub name: Option<String>,
    pub path: Option<String>,
    pub query: Query,
    pub hash: String,
    pub params: Params,
    /// Set once relative resolution has been applied.
    pub normalized: bool,
}

impl Location {
    /// `path + query + hash`, `/` when no path is set.
    pub fn full_path(&self) -> String {
        format!(
            "{}{}{}",
            self.path.as_deref().unwrap_or("/"),
            self.query.stringify(),
            self.hash
        )
    }
}

/// Navigation input as supplied by callers, guards and redirects.
///
/// Deserializes from either a path string or a table with any of
/// `path`, `name`, `params`, `query`, `hash`, `append`, `replace`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawLocationRepr")]
pub struct RawLocation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Params>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<Query>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    /// Resolve a relative path below the current one instead of beside it.
    pub append: bool,
    /// Replace the history entry instead of pushing one.
    pub replace: bool,
    #[serde(skip)]
    pub normalized: bool,
}

impl RawLocation {
    pub fn path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params
            .get_or_insert_with(Params::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query
            .get_or_insert_with(Query::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    pub fn appending(mut self) -> Self {
        self.append = true;
        self
    }

    pub fn replacing(mut self) -> Self {
        self.replace = true;
        self
    }

    /// Mark as already normalized so matching skips relative resolution.
    pub fn as_normalized(mut self) -> Self {
        self.normalized = true;
        self
    }

    /// Short description for logs and failure messages.
    pub fn describe(&self) -> String {
        match (&self.name, &self.path) {
            (Some(name), _) => format!("{{name: {name}}}"),
            (None, Some(path)) => path.clone(),
            (None, None) => "{params}".to_string(),
        }
    }
}

impl From<&str> for RawLocation {
    fn from(path: &str) -> Self {
        Self::path(path)
    }
}

impl From<String> for RawLocation {
    fn from(path: String) -> Self {
        Self::path(path)
    }
}

impl From<&String> for RawLocation {
    fn from(path: &String) -> Self {
        Self::path(path.clone())
    }
}

impl From<Location> for RawLocation {
    fn from(location: Location) -> Self {
        Self {
            path: location.path,
            name: location.name,
            params: Some(location.params),
            query: Some(location.query),
            hash: Some(location.hash),
            append: false,
            replace: false,
            normalized: location.normalized,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLocationRepr {
    Path(String),
    Target {
        #[serde(default)]
        path: Option<String>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        params: Option<Params>,
        #[serde(default)]
        query: Option<Query>,
        #[serde(default)]
        hash: Option<String>,
        #[serde(default)]
        append: bool,
        #[serde(default)]
        replace: bool,
    },
}

impl From<RawLocationRepr> for RawLocation {
    fn from(repr: RawLocationRepr) -> Self {
        match repr {
            RawLocationRepr::Path(path) => RawLocation::path(path),
            RawLocationRepr::Target {
                path,
                name,
                params,
                query,
                hash,
                append,
                replace,
            } => RawLocation {
                path,
                name,
                params,
                query,
                hash,
                append,
                replace,
                normalized: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Holder {
        to: RawLocation,
    }

    #[test]
    fn test_deserialize_string_target() {
        let holder: Holder = toml::from_str(r#"to = "/home?tab=1""#).unwrap();
        assert_eq!(holder.to.path.as_deref(), Some("/home?tab=1"));
        assert!(holder.to.name.is_none());
    }

    #[test]
    fn test_deserialize_structured_target() {
        let holder: Holder = toml::from_str(
            r#"
            [to]
            name = "user"
            replace = true
            params = { id = "42" }
            "#,
        )
        .unwrap();
        assert_eq!(holder.to.name.as_deref(), Some("user"));
        assert!(holder.to.replace);
        assert_eq!(
            holder.to.params.unwrap().get("id").map(String::as_str),
            Some("42")
        );
    }

    #[test]
    fn test_full_path() {
        let mut loc = Location {
            path: Some("/a".into()),
            hash: "#x".into(),
            ..Location::default()
        };
        loc.query.insert("q", "1");
        assert_eq!(loc.full_path(), "/a?q=1#x");
        assert_eq!(Location::default().full_path(), "/");
    }
}
