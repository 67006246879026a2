//! Seams towards the rendering collaborator.
//!
//! # Responsibilities
//! - Track live view instances per (record, slot), written by the renderer
//! - Compute the props a matched slot receives
//! - Poll for an instance on behalf of deferred enter-guard callbacks

use dashmap::DashMap;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::navigation::component::ComponentSlot;
use crate::navigation::guard::InstanceCallback;
use crate::routing::record::{RecordId, RouteRecord};
use crate::routing::route::Route;

/// Opaque handle to a rendered instance.
pub type ViewInstance = Arc<dyn Any + Send + Sync>;

/// Props handed to a rendered slot.
pub type Props = Map<String, Value>;

/// Non-owning side table of rendered instances, keyed by (record, slot).
///
/// The router only reads it; the renderer registers and clears entries.
#[derive(Clone, Default)]
pub struct InstanceRegistry {
    inner: Arc<DashMap<(RecordId, String), ViewInstance>>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind (`Some`) or unbind (`None`) the instance rendered for a slot.
    pub fn register(&self, record: RecordId, slot: &str, instance: Option<ViewInstance>) {
        match instance {
            Some(instance) => {
                self.inner.insert((record, slot.to_string()), instance);
            }
            None => {
                self.inner.remove(&(record, slot.to_string()));
            }
        }
    }

    pub fn get(&self, record: RecordId, slot: &str) -> Option<ViewInstance> {
        self.inner
            .get(&(record, slot.to_string()))
            .map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl fmt::Debug for InstanceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceRegistry")
            .field("bound", &self.inner.len())
            .finish()
    }
}

/// Resolver for route-dependent props.
#[derive(Clone)]
pub struct PropsFn(Arc<dyn Fn(&Route) -> Props + Send + Sync>);

impl PropsFn {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Route) -> Props + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }
}

impl fmt::Debug for PropsFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PropsFn")
    }
}

/// How a slot receives props.
///
/// Deserializes from a boolean or a table of static props.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PropsSpec {
    /// `true` passes every route param.
    Params(bool),
    Static(Props),
    #[serde(skip)]
    Dynamic(PropsFn),
}

/// Props for a slot given its spec; `None` means no props.
pub fn resolve_props(spec: Option<&PropsSpec>, route: &Route) -> Option<Props> {
    match spec? {
        PropsSpec::Params(false) => None,
        PropsSpec::Params(true) => Some(
            route
                .params
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        ),
        PropsSpec::Static(props) => Some(props.clone()),
        PropsSpec::Dynamic(f) => Some((f.0)(route)),
    }
}

/// What the renderer needs to draw one slot at one depth of a route.
#[derive(Debug, Clone)]
pub struct ViewBinding {
    pub record: Arc<RouteRecord>,
    pub slot: String,
    pub component: ComponentSlot,
    pub props: Option<Props>,
}

/// Binding for `slot` at `depth` of `route`'s matched chain.
pub fn bind_view(route: &Route, depth: usize, slot: &str) -> Option<ViewBinding> {
    let record = route.matched.get(depth)?;
    let component = record.components.get(slot)?.clone();
    let props = resolve_props(record.props.get(slot), route);
    Some(ViewBinding {
        record: record.clone(),
        slot: slot.to_string(),
        component,
        props,
    })
}

/// Wait for the instance of (record, slot), then run `callback` with it.
///
/// Checks once per `interval` and gives up as soon as `is_valid` reports the
/// navigation was superseded. There is no deadline otherwise.
pub async fn poll_instance<V>(
    registry: InstanceRegistry,
    record: RecordId,
    slot: String,
    interval: Duration,
    is_valid: V,
    callback: InstanceCallback,
) where
    V: Fn() -> bool,
{
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        if let Some(instance) = registry.get(record, &slot) {
            callback.call(instance);
            return;
        }
        if !is_valid() {
            tracing::debug!(record = record.0, slot = %slot, "Navigation superseded, dropping enter callback");
            return;
        }
    }
}
