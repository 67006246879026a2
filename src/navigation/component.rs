//! View components referenced by route records.
//!
//! The router never renders anything; a component is an opaque name plus the
//! in-component guards the transition engine has to run.

use arc_swap::ArcSwapOption;
use futures::future::{BoxFuture, FutureExt};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::navigation::guard::{GuardError, InstanceGuard, NavigationGuard};

/// A resolved component definition.
#[derive(Debug, Clone, Default)]
pub struct Component {
    pub name: String,
    pub before_route_enter: Option<NavigationGuard>,
    pub before_route_update: Option<InstanceGuard>,
    pub before_route_leave: Option<InstanceGuard>,
}

impl Component {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn on_enter(mut self, guard: NavigationGuard) -> Self {
        self.before_route_enter = Some(guard);
        self
    }

    pub fn on_update(mut self, guard: InstanceGuard) -> Self {
        self.before_route_update = Some(guard);
        self
    }

    pub fn on_leave(mut self, guard: InstanceGuard) -> Self {
        self.before_route_leave = Some(guard);
        self
    }
}

type Loader = Arc<dyn Fn() -> BoxFuture<'static, Result<Component, GuardError>> + Send + Sync>;

/// A component loaded on first activation. Clones share the loaded result.
#[derive(Clone)]
pub struct LazyComponent {
    loader: Loader,
    resolved: Arc<ArcSwapOption<Component>>,
}

impl LazyComponent {
    pub fn new<F, Fut>(loader: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Component, GuardError>> + Send + 'static,
    {
        Self {
            loader: Arc::new(move || loader().boxed()),
            resolved: Arc::new(ArcSwapOption::empty()),
        }
    }

    pub fn get(&self) -> Option<Arc<Component>> {
        self.resolved.load_full()
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.load().is_some()
    }

    /// Load once; later calls return the cached component.
    pub async fn load(&self) -> Result<Arc<Component>, GuardError> {
        if let Some(component) = self.get() {
            return Ok(component);
        }
        let component = Arc::new((self.loader)().await?);
        tracing::debug!(component = %component.name, "Lazy component resolved");
        self.resolved.store(Some(component.clone()));
        Ok(component)
    }
}

impl fmt::Debug for LazyComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyComponent")
            .field("resolved", &self.get().map(|c| c.name.clone()))
            .finish()
    }
}

/// Handler bound to one view slot of a record.
#[derive(Debug, Clone)]
pub enum ComponentSlot {
    Ready(Arc<Component>),
    Lazy(LazyComponent),
}

impl ComponentSlot {
    /// The component, if it is available without loading.
    pub fn resolved(&self) -> Option<Arc<Component>> {
        match self {
            ComponentSlot::Ready(c) => Some(c.clone()),
            ComponentSlot::Lazy(lazy) => lazy.get(),
        }
    }

    /// The loader, if this slot still has to be loaded.
    pub fn pending(&self) -> Option<&LazyComponent> {
        match self {
            ComponentSlot::Lazy(lazy) if !lazy.is_resolved() => Some(lazy),
            _ => None,
        }
    }
}

impl From<Component> for ComponentSlot {
    fn from(component: Component) -> Self {
        ComponentSlot::Ready(Arc::new(component))
    }
}

impl From<LazyComponent> for ComponentSlot {
    fn from(lazy: LazyComponent) -> Self {
        ComponentSlot::Lazy(lazy)
    }
}

/// Config files name components by string.
impl From<String> for ComponentSlot {
    fn from(name: String) -> Self {
        ComponentSlot::Ready(Arc::new(Component::new(name)))
    }
}

impl From<&str> for ComponentSlot {
    fn from(name: &str) -> Self {
        ComponentSlot::from(name.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for ComponentSlot {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        String::deserialize(deserializer).map(ComponentSlot::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_lazy_component_loads_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let lazy = LazyComponent::new(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, GuardError>(Component::new("Settings"))
            }
        });

        let slot = ComponentSlot::from(lazy.clone());
        assert!(slot.resolved().is_none());
        assert!(slot.pending().is_some());

        assert_eq!(lazy.load().await.unwrap().name, "Settings");
        assert_eq!(lazy.load().await.unwrap().name, "Settings");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(slot.pending().is_none());
        assert_eq!(slot.resolved().unwrap().name, "Settings");
    }

    #[test]
    fn test_deserialize_from_name() {
        #[derive(serde::Deserialize)]
        struct Holder {
            component: ComponentSlot,
        }
        let holder: Holder = toml::from_str(r#"component = "Home""#).unwrap();
        assert_eq!(holder.component.resolved().unwrap().name, "Home");
    }
}
