//! The transition engine.
//!
//! # Responsibilities
//! - Own the current route and the single pending navigation
//! - Build and run the guard queues for a navigation
//! - Commit, notify observers, and report exactly one outcome per navigation
//!
//! # Design Decisions
//! - Each navigation gets a generation token when it is started, not when its
//!   future is first polled; starting one makes every older navigation stale,
//!   and stale navigations stop at their next step
//! - The caller's completion runs after the listener and after hooks and
//!   before the first-navigation readiness callbacks
//! - Steps are thunks, so a guard is only invoked when its turn comes
//! - Engine state sits behind a `parking_lot::Mutex` that is never held
//!   across an `.await` or while user callbacks run

use futures::future::{self, BoxFuture, FutureExt};
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};
use std::time::Duration;

use crate::location::RawLocation;
use crate::navigation::component::{Component, LazyComponent};
use crate::navigation::diff::{resolve_queue, RecordDiff};
use crate::navigation::failure::{GuardPanic, NavigationFailure};
use crate::navigation::guard::{GuardError, GuardFuture, GuardOutcome, InstanceCallback, InstanceGuard};
use crate::navigation::history::{ensure_url, HistoryBackend};
use crate::navigation::hooks::Hooks;
use crate::navigation::view::{poll_instance, InstanceRegistry};
use crate::observability::metrics;
use crate::routing::matcher::Matcher;
use crate::routing::record::{RecordId, RouteRecord};
use crate::routing::route::Route;

pub type Listener = Arc<dyn Fn(&Arc<Route>) + Send + Sync>;
pub type ErrorObserver = Arc<dyn Fn(&GuardError) + Send + Sync>;
pub type ReadyCallback = Box<dyn FnOnce(&Arc<Route>) + Send>;
pub type ReadyErrorCallback = Box<dyn FnOnce(&NavigationFailure) + Send>;
/// Receives the outcome of one navigation.
pub type Completion = Box<dyn FnOnce(&NavigationResult) + Send>;

pub type NavigationResult = Result<Arc<Route>, NavigationFailure>;

/// What to do with the history entry once a navigation commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlUpdate {
    /// Only make sure the URL shows the committed route.
    Keep,
    Push,
    Replace,
}

type StepFn = Box<dyn FnOnce() -> GuardFuture + Send>;

/// One queue entry. Enter guards carry the view they may defer a callback to.
struct Step {
    run: StepFn,
    view: Option<(RecordId, String)>,
}

impl Step {
    fn new<F>(run: F) -> Self
    where
        F: FnOnce() -> GuardFuture + Send + 'static,
    {
        Self {
            run: Box::new(run),
            view: None,
        }
    }

    fn for_view(mut self, record: RecordId, slot: &str) -> Self {
        self.view = Some((record, slot.to_string()));
        self
    }
}

struct Deferred {
    record: RecordId,
    slot: String,
    callback: InstanceCallback,
}

enum Interrupt {
    Failed(NavigationFailure),
    Redirect { to: RawLocation, replace: bool },
}

struct EngineState {
    current: Arc<Route>,
    last_token: u64,
    pending_token: Option<u64>,
    pending_route: Option<Arc<Route>>,
}

#[derive(Default)]
struct Observers {
    listener: Option<Listener>,
    errors: Vec<ErrorObserver>,
    ready: bool,
    ready_callbacks: Vec<ReadyCallback>,
    ready_error_callbacks: Vec<ReadyErrorCallback>,
}

/// Navigation state machine shared by every `Router` handle.
pub struct Engine {
    pub(crate) matcher: Matcher,
    pub(crate) hooks: Hooks,
    pub(crate) instances: InstanceRegistry,
    history: RwLock<Option<Arc<dyn HistoryBackend>>>,
    state: Mutex<EngineState>,
    observers: Mutex<Observers>,
    poll_interval: Duration,
}

impl Engine {
    pub fn new(matcher: Matcher, poll_interval: Duration) -> Self {
        Self {
            matcher,
            hooks: Hooks::default(),
            instances: InstanceRegistry::new(),
            history: RwLock::new(None),
            state: Mutex::new(EngineState {
                current: Arc::new(Route::start()),
                last_token: 0,
                pending_token: None,
                pending_route: None,
            }),
            observers: Mutex::new(Observers::default()),
            poll_interval,
        }
    }

    pub fn current(&self) -> Arc<Route> {
        self.state.lock().current.clone()
    }

    pub fn pending(&self) -> Option<Arc<Route>> {
        self.state.lock().pending_route.clone()
    }

    pub fn history(&self) -> Option<Arc<dyn HistoryBackend>> {
        self.history.read().clone()
    }

    pub fn set_history(&self, backend: Arc<dyn HistoryBackend>) {
        *self.history.write() = Some(backend);
    }

    pub fn listen(&self, listener: Listener) {
        self.observers.lock().listener = Some(listener);
    }

    pub fn on_error(&self, observer: ErrorObserver) {
        self.observers.lock().errors.push(observer);
    }

    /// Run `callback` once the first navigation settles, or right away if it
    /// already has. `on_failure` runs instead if that navigation failed.
    pub fn on_ready(&self, callback: ReadyCallback, on_failure: Option<ReadyErrorCallback>) {
        let mut observers = self.observers.lock();
        if observers.ready {
            drop(observers);
            callback(&self.current());
            return;
        }
        observers.ready_callbacks.push(callback);
        if let Some(on_failure) = on_failure {
            observers.ready_error_callbacks.push(on_failure);
        }
    }

    /// Start a navigation and make it the pending one right away.
    ///
    /// The returned future owns everything it needs, so it can be awaited in
    /// place or spawned. `on_done` receives the outcome before readiness
    /// callbacks run.
    pub fn start_navigation(
        self: &Arc<Self>,
        raw: RawLocation,
        url: UrlUpdate,
        on_done: Option<Completion>,
    ) -> BoxFuture<'static, NavigationResult> {
        let (token, from) = {
            let mut state = self.state.lock();
            state.last_token += 1;
            state.pending_token = Some(state.last_token);
            state.pending_route = None;
            (state.last_token, state.current.clone())
        };
        self.clone().run(token, from, raw, url, on_done).boxed()
    }

    async fn run(
        self: Arc<Self>,
        token: u64,
        from: Arc<Route>,
        raw: RawLocation,
        url: UrlUpdate,
        on_done: Option<Completion>,
    ) -> NavigationResult {
        let to = Arc::new(self.matcher.match_route(raw, Some(from.as_ref()), None));
        {
            let mut state = self.state.lock();
            if state.pending_token == Some(token) {
                state.pending_route = Some(to.clone());
            }
        }
        tracing::debug!(token, from = %from.full_path, to = %to.full_path, "Navigation started");

        if is_duplicate(&from, &to) {
            self.ensure_url(false);
            return self.fail(token, NavigationFailure::Duplicated(to.full_path.clone()), on_done);
        }

        let diff = resolve_queue(&from.matched, &to.matched);
        let mut deferred = Vec::new();

        let first = self.first_queue(&diff, &to, &from);
        let mut result = self.run_queue(token, first, &to, &from, &mut deferred).await;
        if result.is_ok() {
            // Lazy components are resolved by now, so their enter guards are visible.
            let second = self.second_queue(&diff, &to, &from);
            result = self.run_queue(token, second, &to, &from, &mut deferred).await;
        }

        match result {
            Ok(()) => self.commit(token, from, to, url, deferred, on_done),
            Err(Interrupt::Failed(failure)) => self.fail(token, failure, on_done),
            Err(Interrupt::Redirect { to: target, replace }) => {
                let failure = NavigationFailure::Redirected {
                    from: from.full_path.clone(),
                    to: to.full_path.clone(),
                };
                let _ = self.fail(token, failure.clone(), on_done);
                let follow_up = if replace { UrlUpdate::Replace } else { UrlUpdate::Push };
                if let Err(e) = self.start_navigation(target, follow_up, None).await {
                    tracing::debug!(error = %e, "Redirect target did not complete");
                }
                Err(failure)
            }
        }
    }

    /// Leave guards, global before guards, update guards, route enter guards,
    /// then lazy component resolution.
    fn first_queue(&self, diff: &RecordDiff, to: &Arc<Route>, from: &Arc<Route>) -> Vec<Step> {
        let mut steps = Vec::new();

        let mut leave = self.instance_guards(&diff.deactivated, |c| c.before_route_leave.as_ref(), to, from);
        leave.reverse();
        steps.extend(leave);

        for guard in self.hooks.before_each.snapshot() {
            let (to, from) = (to.clone(), from.clone());
            steps.push(Step::new(move || guard.call(to, from)));
        }

        steps.extend(self.instance_guards(&diff.updated, |c| c.before_route_update.as_ref(), to, from));

        for record in &diff.activated {
            if let Some(guard) = record.before_enter.clone() {
                let (to, from) = (to.clone(), from.clone());
                steps.push(Step::new(move || guard.call(to, from)));
            }
        }

        let lazy: Vec<LazyComponent> = diff
            .activated
            .iter()
            .flat_map(|record| record.components.values())
            .filter_map(|slot| slot.pending().cloned())
            .collect();
        steps.push(Step::new(move || resolve_components(lazy)));

        steps
    }

    /// Enter guards of activated components, then global resolve guards.
    fn second_queue(&self, diff: &RecordDiff, to: &Arc<Route>, from: &Arc<Route>) -> Vec<Step> {
        let mut steps = Vec::new();
        for record in &diff.activated {
            for (slot, component) in &record.components {
                let Some(guard) = component.resolved().and_then(|c| c.before_route_enter.clone()) else {
                    continue;
                };
                let (to, from) = (to.clone(), from.clone());
                steps.push(Step::new(move || guard.call(to, from)).for_view(record.id, slot));
            }
        }
        for guard in self.hooks.before_resolve.snapshot() {
            let (to, from) = (to.clone(), from.clone());
            steps.push(Step::new(move || guard.call(to, from)));
        }
        steps
    }

    /// In-component guards bound to live instances; slots without one are skipped.
    fn instance_guards(
        &self,
        records: &[Arc<RouteRecord>],
        pick: fn(&Component) -> Option<&InstanceGuard>,
        to: &Arc<Route>,
        from: &Arc<Route>,
    ) -> Vec<Step> {
        let mut steps = Vec::new();
        for record in records {
            for (slot, component) in &record.components {
                let Some(component) = component.resolved() else {
                    continue;
                };
                let Some(guard) = pick(&component).cloned() else {
                    continue;
                };
                let Some(instance) = self.instances.get(record.id, slot) else {
                    continue;
                };
                let (to, from) = (to.clone(), from.clone());
                steps.push(Step::new(move || guard.call(instance, to, from)));
            }
        }
        steps
    }

    async fn run_queue(
        &self,
        token: u64,
        steps: Vec<Step>,
        to: &Arc<Route>,
        from: &Arc<Route>,
        deferred: &mut Vec<Deferred>,
    ) -> Result<(), Interrupt> {
        for Step { run, view } in steps {
            if !self.is_pending(token) {
                return Err(Interrupt::Failed(cancelled(from, to)));
            }
            let outcome = run_step(run).await;
            if !self.is_pending(token) {
                return Err(Interrupt::Failed(cancelled(from, to)));
            }

            match outcome {
                GuardOutcome::Continue => {}
                GuardOutcome::ContinueWith(callback) => match view {
                    Some((record, slot)) => deferred.push(Deferred {
                        record,
                        slot,
                        callback,
                    }),
                    None => {
                        tracing::warn!(to = %to.full_path, "Instance callbacks are only honored in component enter guards");
                    }
                },
                GuardOutcome::Abort => {
                    self.ensure_url(true);
                    return Err(Interrupt::Failed(NavigationFailure::Aborted {
                        from: from.full_path.clone(),
                        to: to.full_path.clone(),
                    }));
                }
                GuardOutcome::Error(error) => {
                    self.ensure_url(true);
                    return Err(Interrupt::Failed(NavigationFailure::Errored(error)));
                }
                GuardOutcome::Redirect { to: target, replace } => {
                    tracing::debug!(from = %to.full_path, to = %target.describe(), "Guard redirected");
                    return Err(Interrupt::Redirect { to: target, replace });
                }
            }
        }
        Ok(())
    }

    fn commit(
        self: &Arc<Self>,
        token: u64,
        from: Arc<Route>,
        to: Arc<Route>,
        url: UrlUpdate,
        deferred: Vec<Deferred>,
        on_done: Option<Completion>,
    ) -> NavigationResult {
        {
            let mut state = self.state.lock();
            if state.pending_token != Some(token) {
                drop(state);
                return self.fail(token, cancelled(&from, &to), on_done);
            }
            state.pending_token = None;
            state.pending_route = None;
            state.current = to.clone();
        }

        let listener = self.observers.lock().listener.clone();
        if let Some(listener) = listener {
            listener(&to);
        }
        for hook in self.hooks.after_each.snapshot() {
            hook.call(&to, &from);
        }
        if let Some(history) = self.history() {
            match url {
                UrlUpdate::Push => history.push_url(&to.full_path),
                UrlUpdate::Replace => history.replace_url(&to.full_path),
                UrlUpdate::Keep => {}
            }
        }
        self.ensure_url(false);

        metrics::record_navigation("completed");
        tracing::debug!(token, from = %from.full_path, to = %to.full_path, "Navigation completed");

        if let Some(done) = on_done {
            done(&Ok(to.clone()));
        }

        let ready_callbacks = {
            let mut observers = self.observers.lock();
            if observers.ready {
                Vec::new()
            } else {
                observers.ready = true;
                observers.ready_error_callbacks.clear();
                std::mem::take(&mut observers.ready_callbacks)
            }
        };
        for callback in ready_callbacks {
            callback(&to);
        }

        self.spawn_deferred(&to, deferred);
        Ok(to)
    }

    fn fail(&self, token: u64, failure: NavigationFailure, on_done: Option<Completion>) -> NavigationResult {
        {
            let mut state = self.state.lock();
            if state.pending_token == Some(token) {
                state.pending_token = None;
                state.pending_route = None;
            }
        }
        metrics::record_navigation(failure.label());

        match &failure {
            NavigationFailure::Errored(error) => {
                let observers = self.observers.lock().errors.clone();
                if observers.is_empty() {
                    tracing::warn!(token, error = %error, "Uncaught error during route navigation");
                }
                for observer in observers {
                    observer(error);
                }
            }
            other => tracing::debug!(token, reason = other.label(), "{other}"),
        }

        if let Some(done) = on_done {
            done(&Err(failure.clone()));
        }

        if failure.settles_ready() {
            let callbacks = {
                let mut observers = self.observers.lock();
                if observers.ready {
                    Vec::new()
                } else {
                    observers.ready = true;
                    observers.ready_callbacks.clear();
                    std::mem::take(&mut observers.ready_error_callbacks)
                }
            };
            for callback in callbacks {
                callback(&failure);
            }
        }
        Err(failure)
    }

    fn is_pending(&self, token: u64) -> bool {
        self.state.lock().pending_token == Some(token)
    }

    fn ensure_url(&self, push: bool) {
        if let Some(history) = self.history() {
            ensure_url(history.as_ref(), &self.current(), push);
        }
    }

    /// Poll for the instances enter callbacks wait on, for as long as `route`
    /// stays the current route.
    fn spawn_deferred(self: &Arc<Self>, route: &Arc<Route>, deferred: Vec<Deferred>) {
        if deferred.is_empty() {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(count = deferred.len(), "No Tokio runtime, dropping enter guard callbacks");
            return;
        };
        for Deferred { record, slot, callback } in deferred {
            let engine: Weak<Engine> = Arc::downgrade(self);
            let route = route.clone();
            let is_valid = move || engine.upgrade().is_some_and(|e| Arc::ptr_eq(&e.current(), &route));
            runtime.spawn(poll_instance(
                self.instances.clone(),
                record,
                slot,
                self.poll_interval,
                is_valid,
                callback,
            ));
        }
    }
}

fn is_duplicate(from: &Route, to: &Route) -> bool {
    to.is_same_route(from)
        && to.matched.len() == from.matched.len()
        && match (to.matched.last(), from.matched.last()) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
}

fn cancelled(from: &Route, to: &Route) -> NavigationFailure {
    NavigationFailure::Cancelled {
        from: from.full_path.clone(),
        to: to.full_path.clone(),
    }
}

fn resolve_components(lazy: Vec<LazyComponent>) -> GuardFuture {
    async move {
        if lazy.is_empty() {
            return GuardOutcome::Continue;
        }
        match future::try_join_all(lazy.iter().map(LazyComponent::load)).await {
            Ok(_) => GuardOutcome::Continue,
            Err(error) => GuardOutcome::Error(error),
        }
    }
    .boxed()
}

/// Invoke a step, turning a panic in the guard into an error outcome.
async fn run_step(run: StepFn) -> GuardOutcome {
    let future = match std::panic::catch_unwind(AssertUnwindSafe(run)) {
        Ok(future) => future,
        Err(payload) => return panic_outcome(payload),
    };
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(payload) => panic_outcome(payload),
    }
}

fn panic_outcome(payload: Box<dyn Any + Send>) -> GuardOutcome {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    GuardOutcome::error(GuardPanic(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MatchingConfig, RouteConfig};
    use crate::navigation::guard::NavigationGuard;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn engine(configs: Vec<RouteConfig>) -> Arc<Engine> {
        let matcher = Matcher::new(&configs, MatchingConfig::default()).unwrap();
        Arc::new(Engine::new(matcher, Duration::from_millis(1)))
    }

    #[tokio::test]
    async fn test_commit_sets_current() {
        let engine = engine(vec![RouteConfig::new("/a")]);
        let route = engine
            .start_navigation("/a".into(), UrlUpdate::Keep, None)
            .await
            .unwrap();
        assert_eq!(route.path, "/a");
        assert_eq!(engine.current().path, "/a");
        assert!(engine.pending().is_none());
    }

    #[tokio::test]
    async fn test_token_taken_at_call_time() {
        let engine = engine(vec![RouteConfig::new("/a"), RouteConfig::new("/b")]);
        let first = engine.start_navigation("/a".into(), UrlUpdate::Keep, None);
        let second = engine.start_navigation("/b".into(), UrlUpdate::Keep, None);

        // Polling order must not matter; the later call wins.
        assert_eq!(second.await.unwrap().path, "/b");
        let err = first.await.unwrap_err();
        assert!(matches!(err, NavigationFailure::Cancelled { .. }));
        assert_eq!(engine.current().path, "/b");
    }

    #[tokio::test]
    async fn test_completion_runs_before_ready_callbacks() {
        let engine = engine(vec![RouteConfig::new("/a")]);
        let order = Arc::new(Mutex::new(Vec::new()));
        let (ready, listener, done) = (order.clone(), order.clone(), order.clone());
        engine.on_ready(Box::new(move |_: &Arc<Route>| ready.lock().push("ready")), None);
        engine.listen(Arc::new(move |_: &Arc<Route>| listener.lock().push("listener")));

        let completion: Completion = Box::new(move |result: &NavigationResult| {
            assert!(result.is_ok());
            done.lock().push("complete");
        });
        engine
            .start_navigation("/a".into(), UrlUpdate::Keep, Some(completion))
            .await
            .unwrap();
        assert_eq!(*order.lock(), vec!["listener", "complete", "ready"]);
    }

    #[tokio::test]
    async fn test_duplicate_navigation() {
        let engine = engine(vec![RouteConfig::new("/a")]);
        engine.start_navigation("/a".into(), UrlUpdate::Keep, None).await.unwrap();
        let err = engine
            .start_navigation("/a/".into(), UrlUpdate::Keep, None)
            .await
            .unwrap_err();
        assert!(matches!(err, NavigationFailure::Duplicated(_)));
    }

    #[tokio::test]
    async fn test_panicking_guard_is_an_error() {
        let engine = engine(vec![RouteConfig::new("/boom").before_enter(NavigationGuard::new(
            |to: Arc<Route>, _from| async move {
                assert!(to.path.is_empty(), "guard exploded");
                GuardOutcome::Continue
            },
        ))]);
        let err = engine
            .start_navigation("/boom".into(), UrlUpdate::Keep, None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("guard exploded"));
        assert_eq!(engine.current().path, "/");
    }

    #[tokio::test]
    async fn test_steps_run_lazily_in_order() {
        let engine = engine(vec![RouteConfig::new("/a")]);
        let calls = Arc::new(AtomicUsize::new(0));
        for expected in 0..3 {
            let calls = calls.clone();
            engine.hooks.before_each.register(NavigationGuard::new(move |_to, _from| {
                let seen = calls.fetch_add(1, Ordering::SeqCst);
                async move { GuardOutcome::from(seen == expected && expected < 1) }
            }));
        }
        let err = engine
            .start_navigation("/a".into(), UrlUpdate::Keep, None)
            .await
            .unwrap_err();
        assert!(matches!(err, NavigationFailure::Aborted { .. }));
        // third guard never invoked
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
