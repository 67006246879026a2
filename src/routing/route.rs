//! The resolved, immutable result of a match.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::location::{Location, Params, Query};
use crate::routing::record::RouteRecord;

#[derive(Debug, Clone, Serialize)]
pub struct Route {
    pub name: Option<String>,
    pub path: String,
    pub hash: String,
    pub query: Query,
    pub params: Params,
    pub full_path: String,
    pub meta: Map<String, Value>,
    /// Full path of the location that started a redirect chain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirected_from: Option<String>,
    /// Root-first chain of matched records; empty for a non-match.
    #[serde(serialize_with = "serialize_matched")]
    pub matched: Vec<Arc<RouteRecord>>,
}

impl Route {
    /// Build a route for `record` (or a non-match) at `location`.
    pub fn new(
        record: Option<&Arc<RouteRecord>>,
        location: &Location,
        redirected_from: Option<&Location>,
    ) -> Self {
        let path = location.path.clone().unwrap_or_else(|| "/".to_string());
        let full_path = format!("{}{}{}", path, location.query.stringify(), location.hash);
        Self {
            name: location
                .name
                .clone()
                .or_else(|| record.and_then(|r| r.name.clone())),
            path,
            hash: location.hash.clone(),
            query: location.query.clone(),
            params: location.params.clone(),
            full_path,
            meta: record.map(|r| r.meta.clone()).unwrap_or_default(),
            redirected_from: redirected_from.map(Location::full_path),
            matched: record.map(RouteRecord::chain).unwrap_or_default(),
        }
    }

    /// The route an engine holds before its first navigation.
    pub fn start() -> Self {
        Self::new(None, &Location::default(), None)
    }

    pub fn is_matched(&self) -> bool {
        !self.matched.is_empty()
    }

    /// Deepest matched record.
    pub fn record(&self) -> Option<&Arc<RouteRecord>> {
        self.matched.last()
    }

    /// Same path (ignoring one trailing slash), hash, query and params.
    pub fn is_same_route(&self, other: &Route) -> bool {
        trim_trailing_slash(&self.path) == trim_trailing_slash(&other.path)
            && self.hash == other.hash
            && self.query == other.query
            && self.params == other.params
    }
}

fn trim_trailing_slash(path: &str) -> &str {
    path.strip_suffix('/').unwrap_or(path)
}

fn serialize_matched<S>(matched: &[Arc<RouteRecord>], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_seq(matched.iter().map(|r| r.path.as_str()))
}
