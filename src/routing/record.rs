//! Compiled route records.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::location::RawLocation;
use crate::navigation::component::ComponentSlot;
use crate::navigation::guard::NavigationGuard;
use crate::navigation::view::PropsSpec;
use crate::routing::pattern::PathPattern;
use crate::routing::route::Route;

static NEXT_RECORD_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl RecordId {
    pub(crate) fn next() -> Self {
        RecordId(NEXT_RECORD_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Computes a redirect target from the route that would have been shown.
/// Returning `None` marks the redirect as malformed.
#[derive(Clone)]
pub struct RedirectFn(Arc<dyn Fn(&Route) -> Option<RawLocation> + Send + Sync>);

impl RedirectFn {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Route) -> Option<RawLocation> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, route: &Route) -> Option<RawLocation> {
        (self.0)(route)
    }
}

impl fmt::Debug for RedirectFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RedirectFn")
    }
}

#[derive(Debug, Clone)]
pub enum Redirect {
    Static(RawLocation),
    Dynamic(RedirectFn),
}

impl<'de> Deserialize<'de> for Redirect {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        RawLocation::deserialize(deserializer).map(Redirect::Static)
    }
}

/// Classification of a record, resolved once per match.
#[derive(Debug, Clone)]
pub enum RecordKind {
    Normal,
    Redirect(Redirect),
    /// Registered under an alias path; `target` is the real record's path.
    Alias { target: String },
}

impl RecordKind {
    pub fn label(&self) -> &'static str {
        match self {
            RecordKind::Normal => "normal",
            RecordKind::Redirect(_) => "redirect",
            RecordKind::Alias { .. } => "alias",
        }
    }
}

/// One compiled node of the route tree.
#[derive(Debug)]
pub struct RouteRecord {
    pub id: RecordId,
    /// Absolute, normalized template.
    pub path: String,
    pub pattern: PathPattern,
    pub components: IndexMap<String, ComponentSlot>,
    pub name: Option<String>,
    pub parent: Option<Arc<RouteRecord>>,
    pub kind: RecordKind,
    pub before_enter: Option<NavigationGuard>,
    pub meta: Map<String, Value>,
    pub props: IndexMap<String, PropsSpec>,
    pub aliases: Vec<String>,
}

impl RouteRecord {
    /// Ancestors and self, root first.
    pub fn chain(self: &Arc<Self>) -> Vec<Arc<RouteRecord>> {
        let mut chain = Vec::new();
        let mut cursor = Some(self.clone());
        while let Some(record) = cursor {
            cursor = record.parent.clone();
            chain.push(record);
        }
        chain.reverse();
        chain
    }

    pub fn is_wildcard(&self) -> bool {
        self.pattern.is_wildcard()
    }

    pub fn parent_path(&self) -> &str {
        self.parent.as_ref().map(|p| p.path.as_str()).unwrap_or("/")
    }
}

/// Serializable summary of a record, for listings.
#[derive(Debug, Clone, Serialize)]
pub struct RecordSummary {
    pub id: RecordId,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub components: Vec<String>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
}

impl From<&RouteRecord> for RecordSummary {
    fn from(record: &RouteRecord) -> Self {
        Self {
            id: record.id,
            path: record.path.clone(),
            name: record.name.clone(),
            kind: record.kind.label(),
            parent: record.parent.as_ref().map(|p| p.path.clone()),
            components: record.components.keys().cloned().collect(),
            meta: record.meta.clone(),
        }
    }
}
