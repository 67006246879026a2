//! Public router handle.
//!
//! # Responsibilities
//! - Build the matcher and the transition engine from configuration
//! - Expose matching, navigation, hooks and observers to application code
//! - Bridge to the history and rendering collaborators
//!
//! # Design Decisions
//! - `Router` is a cheap `Clone` handle; all clones drive the same engine
//! - Future-style (`navigate`, `push`, ...) and callback-style
//!   (`transition_to`) calls share one code path and report one outcome each
//! - A navigation becomes the pending one when the method is called, so the
//!   returned futures may be awaited or spawned in any order

use futures::future::BoxFuture;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::{EngineConfig, MatchingConfig, RouteConfig, RouterConfig};
use crate::location::{normalize, Location, RawLocation};
use crate::navigation::component::ComponentSlot;
use crate::navigation::failure::{NavigationFailure, RuntimeUnavailable};
use crate::navigation::guard::{AfterHook, GuardError, NavigationGuard};
use crate::navigation::history::HistoryBackend;
use crate::navigation::hooks::HookId;
use crate::navigation::transition::{Completion, Engine, NavigationResult, UrlUpdate};
use crate::navigation::view::{bind_view, InstanceRegistry, ViewBinding, ViewInstance};
use crate::routing::error::RouteConfigError;
use crate::routing::matcher::Matcher;
use crate::routing::record::{RecordId, RouteRecord};
use crate::routing::route::Route;

/// Result of [`Router::resolve`].
#[derive(Debug, Clone, Serialize)]
pub struct Resolved {
    #[serde(skip)]
    pub location: Location,
    pub route: Route,
    /// What a link to this target should point at.
    pub href: String,
}

#[derive(Clone)]
pub struct Router {
    engine: Arc<Engine>,
}

impl Router {
    /// Router with default matching and engine settings.
    pub fn new(routes: &[RouteConfig]) -> Result<Self, RouteConfigError> {
        Self::with_options(routes, MatchingConfig::default(), EngineConfig::default())
    }

    pub fn with_options(
        routes: &[RouteConfig],
        matching: MatchingConfig,
        engine: EngineConfig,
    ) -> Result<Self, RouteConfigError> {
        let matcher = Matcher::new(routes, matching)?;
        let engine = Engine::new(matcher, Duration::from_millis(engine.poll_interval_ms));
        tracing::info!(records = engine.matcher.table().len(), "Router created");
        Ok(Self {
            engine: Arc::new(engine),
        })
    }

    pub fn from_config(config: &RouterConfig) -> Result<Self, RouteConfigError> {
        Self::with_options(&config.routes, config.matching.clone(), config.engine.clone())
    }

    // --- history collaborator ---

    pub fn set_history(&self, backend: Arc<dyn HistoryBackend>) {
        self.engine.set_history(backend);
    }

    /// Initial navigation to wherever the history backend currently points.
    pub fn start(&self) -> BoxFuture<'static, NavigationResult> {
        let location = self
            .engine
            .history()
            .map(|h| h.current_location())
            .unwrap_or_else(|| "/".to_string());
        self.engine
            .start_navigation(RawLocation::from(location), UrlUpdate::Keep, None)
    }

    /// Navigate and add a history entry, or overwrite the current one when
    /// the target sets `replace`.
    pub fn push(&self, raw: impl Into<RawLocation>) -> BoxFuture<'static, NavigationResult> {
        let raw = raw.into();
        let url = if raw.replace { UrlUpdate::Replace } else { UrlUpdate::Push };
        self.engine.start_navigation(raw, url, None)
    }

    /// Navigate and overwrite the current history entry.
    pub fn replace(&self, raw: impl Into<RawLocation>) -> BoxFuture<'static, NavigationResult> {
        self.engine.start_navigation(raw.into(), UrlUpdate::Replace, None)
    }

    pub fn go(&self, n: i32) {
        match self.engine.history() {
            Some(history) => history.go(n),
            None => tracing::warn!(n, "No history backend, ignoring go()"),
        }
    }

    pub fn back(&self) {
        self.go(-1);
    }

    pub fn forward(&self) {
        self.go(1);
    }

    // --- navigation ---

    /// Navigate without touching history beyond keeping the URL in sync.
    pub fn navigate(&self, raw: impl Into<RawLocation>) -> BoxFuture<'static, NavigationResult> {
        self.engine.start_navigation(raw.into(), UrlUpdate::Keep, None)
    }

    /// Callback-style navigation. Exactly one of the callbacks runs.
    ///
    /// `on_complete` runs after the listener and after hooks, and before
    /// readiness callbacks. Without a Tokio runtime nothing is started and
    /// `on_abort` receives the error; `None` is returned in that case.
    pub fn transition_to<C, A>(
        &self,
        raw: impl Into<RawLocation>,
        on_complete: C,
        on_abort: A,
    ) -> Option<JoinHandle<()>>
    where
        C: FnOnce(Arc<Route>) + Send + 'static,
        A: FnOnce(NavigationFailure) + Send + 'static,
    {
        let raw = raw.into();
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::error!(to = %raw.describe(), "No Tokio runtime, navigation not started");
            on_abort(NavigationFailure::Errored(Arc::new(RuntimeUnavailable)));
            return None;
        };
        let done: Completion = Box::new(move |result: &NavigationResult| match result {
            Ok(route) => on_complete(route.clone()),
            Err(failure) => on_abort(failure.clone()),
        });
        let navigation = self.engine.start_navigation(raw, UrlUpdate::Keep, Some(done));
        Some(runtime.spawn(async move {
            let _ = navigation.await;
        }))
    }

    pub fn current_route(&self) -> Arc<Route> {
        self.engine.current()
    }

    /// Target of the navigation in flight, once it has been resolved.
    pub fn pending(&self) -> Option<Arc<Route>> {
        self.engine.pending()
    }

    // --- hooks and observers ---

    pub fn before_each(&self, guard: NavigationGuard) -> HookId {
        self.engine.hooks.before_each.register(guard)
    }

    pub fn before_resolve(&self, guard: NavigationGuard) -> HookId {
        self.engine.hooks.before_resolve.register(guard)
    }

    pub fn after_each(&self, hook: AfterHook) -> HookId {
        self.engine.hooks.after_each.register(hook)
    }

    pub fn remove_hook(&self, id: HookId) -> bool {
        self.engine.hooks.remove(id)
    }

    /// Replace the single route subscriber.
    pub fn listen<F>(&self, listener: F)
    where
        F: Fn(&Arc<Route>) + Send + Sync + 'static,
    {
        self.engine.listen(Arc::new(listener));
    }

    pub fn on_ready<F>(&self, callback: F)
    where
        F: FnOnce(&Arc<Route>) + Send + 'static,
    {
        self.engine.on_ready(Box::new(callback), None);
    }

    pub fn on_ready_or_fail<F, E>(&self, callback: F, on_failure: E)
    where
        F: FnOnce(&Arc<Route>) + Send + 'static,
        E: FnOnce(&NavigationFailure) + Send + 'static,
    {
        self.engine.on_ready(Box::new(callback), Some(Box::new(on_failure)));
    }

    /// Observe errors raised by guards.
    pub fn on_error<F>(&self, observer: F)
    where
        F: Fn(&GuardError) + Send + Sync + 'static,
    {
        self.engine.on_error(Arc::new(observer));
    }

    // --- matching ---

    pub fn match_route(
        &self,
        raw: impl Into<RawLocation>,
        current: Option<&Route>,
        redirected_from: Option<&Location>,
    ) -> Route {
        self.engine.matcher.match_route(raw, current, redirected_from)
    }

    /// Resolve a target relative to the current route without navigating.
    pub fn resolve(&self, raw: impl Into<RawLocation>, append: bool) -> Resolved {
        let raw = raw.into();
        let current = self.current_route();
        let location = normalize(&raw, Some(current.as_ref()), append);
        let route = self.match_route(location.clone(), Some(current.as_ref()), None);
        let href = route.redirected_from.clone().unwrap_or_else(|| route.full_path.clone());
        Resolved {
            location,
            route,
            href,
        }
    }

    /// Component slots of a target, or of the current route.
    pub fn matched_components(&self, raw: Option<RawLocation>) -> Vec<ComponentSlot> {
        let route = match raw {
            Some(raw) => Arc::new(self.resolve(raw, false).route),
            None => self.current_route(),
        };
        route
            .matched
            .iter()
            .flat_map(|record| record.components.values().cloned())
            .collect()
    }

    pub fn add_routes(&self, routes: &[RouteConfig]) -> Result<(), RouteConfigError> {
        self.engine.matcher.add_routes(routes)
    }

    /// Registered records in match priority order.
    pub fn routes(&self) -> Vec<Arc<RouteRecord>> {
        self.engine.matcher.table().records().cloned().collect()
    }

    /// Add routes from every config received until the sender is dropped.
    pub async fn follow_config(&self, mut updates: mpsc::UnboundedReceiver<RouterConfig>) {
        while let Some(config) = updates.recv().await {
            match self.add_routes(&config.routes) {
                Ok(()) => tracing::info!(records = self.engine.matcher.table().len(), "Routes reloaded"),
                Err(e) => tracing::error!(error = %e, "Rejected reloaded routes, keeping current table"),
            }
        }
    }

    // --- rendering collaborator ---

    pub fn view(&self, route: &Route, depth: usize, slot: &str) -> Option<ViewBinding> {
        bind_view(route, depth, slot)
    }

    pub fn register_instance(&self, record: RecordId, slot: &str, instance: Option<ViewInstance>) {
        self.engine.instances.register(record, slot, instance);
    }

    pub fn instances(&self) -> &InstanceRegistry {
        &self.engine.instances
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("current", &self.engine.current().full_path)
            .field("records", &self.engine.matcher.table().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_and_href() {
        let router = Router::new(&[
            RouteConfig::new("/docs/:page").name("doc"),
            RouteConfig::new("/old").redirect("/docs/intro"),
        ])
        .unwrap();

        let resolved = router.resolve("/docs/setup?v=2", false);
        assert_eq!(resolved.href, "/docs/setup?v=2");
        assert_eq!(resolved.route.params.get("page").map(String::as_str), Some("setup"));

        let redirected = router.resolve("/old", false);
        assert_eq!(redirected.route.path, "/docs/intro");
        assert_eq!(redirected.href, "/old");
    }

    #[test]
    fn test_routes_and_matched_components() {
        let router = Router::new(&[
            RouteConfig::new("/a").component("A").named_component("side", "Side"),
            RouteConfig::new("*").component("NotFound"),
        ])
        .unwrap();
        let paths: Vec<String> = router.routes().iter().map(|r| r.path.clone()).collect();
        assert_eq!(paths, vec!["/a", "*"]);

        let slots = router.matched_components(Some("/a".into()));
        assert_eq!(slots.len(), 2);
        assert!(router.matched_components(None).is_empty());
    }

    #[test]
    fn test_transition_to_without_runtime_reports_abort() {
        let router = Router::new(&[RouteConfig::new("/a")]).unwrap();
        let (tx, rx) = std::sync::mpsc::channel();
        let handle = router.transition_to(
            "/a",
            |_| panic!("must not complete"),
            move |failure| tx.send(failure.to_string()).unwrap(),
        );
        assert!(handle.is_none());
        assert!(rx.recv().unwrap().contains("no Tokio runtime"));
        assert_eq!(router.current_route().path, "/");
        assert!(router.pending().is_none());
    }
}
