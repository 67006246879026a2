//! Guard signatures and outcomes.
//!
//! Every pipeline step has the shape `(to, from) -> Future<Output = GuardOutcome>`.
//! In-component update/leave guards also receive the live view instance they
//! are bound to.

use futures::future::{BoxFuture, FutureExt};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::location::RawLocation;
use crate::navigation::view::ViewInstance;
use crate::routing::route::Route;

/// Error value supplied by (or raised inside) a guard.
pub type GuardError = Arc<dyn std::error::Error + Send + Sync>;

pub type GuardFuture = BoxFuture<'static, GuardOutcome>;

/// How a guard wants the navigation to proceed.
pub enum GuardOutcome {
    Continue,
    /// Continue, and run the callback with the view instance once it is mounted.
    /// Only meaningful for enter guards.
    ContinueWith(InstanceCallback),
    Abort,
    Error(GuardError),
    Redirect { to: RawLocation, replace: bool },
}

impl GuardOutcome {
    pub fn redirect(to: impl Into<RawLocation>) -> Self {
        let to = to.into();
        let replace = to.replace;
        GuardOutcome::Redirect { to, replace }
    }

    pub fn error<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        GuardOutcome::Error(Arc::new(error))
    }

    pub fn with_instance<F>(f: F) -> Self
    where
        F: FnOnce(ViewInstance) + Send + 'static,
    {
        GuardOutcome::ContinueWith(InstanceCallback(Box::new(f)))
    }
}

impl From<bool> for GuardOutcome {
    fn from(proceed: bool) -> Self {
        if proceed {
            GuardOutcome::Continue
        } else {
            GuardOutcome::Abort
        }
    }
}

impl fmt::Debug for GuardOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardOutcome::Continue => f.write_str("Continue"),
            GuardOutcome::ContinueWith(_) => f.write_str("ContinueWith(..)"),
            GuardOutcome::Abort => f.write_str("Abort"),
            GuardOutcome::Error(e) => write!(f, "Error({e})"),
            GuardOutcome::Redirect { to, replace } => f
                .debug_struct("Redirect")
                .field("to", to)
                .field("replace", replace)
                .finish(),
        }
    }
}

/// Deferred callback of an enter guard.
pub struct InstanceCallback(Box<dyn FnOnce(ViewInstance) + Send>);

impl InstanceCallback {
    pub fn from_fn<F>(f: F) -> Self
    where
        F: FnOnce(ViewInstance) + Send + 'static,
    {
        Self(Box::new(f))
    }

    pub fn call(self, instance: ViewInstance) {
        (self.0)(instance)
    }
}

/// Global before/resolve guard, route `before_enter`, or component enter guard.
#[derive(Clone)]
pub struct NavigationGuard(Arc<dyn Fn(Arc<Route>, Arc<Route>) -> GuardFuture + Send + Sync>);

impl NavigationGuard {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Arc<Route>, Arc<Route>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = GuardOutcome> + Send + 'static,
    {
        Self(Arc::new(move |to: Arc<Route>, from: Arc<Route>| f(to, from).boxed()))
    }

    pub fn call(&self, to: Arc<Route>, from: Arc<Route>) -> GuardFuture {
        (self.0)(to, from)
    }
}

impl fmt::Debug for NavigationGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NavigationGuard")
    }
}

/// Component update/leave guard, bound to the live view instance.
#[derive(Clone)]
pub struct InstanceGuard(
    Arc<dyn Fn(ViewInstance, Arc<Route>, Arc<Route>) -> GuardFuture + Send + Sync>,
);

impl InstanceGuard {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(ViewInstance, Arc<Route>, Arc<Route>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = GuardOutcome> + Send + 'static,
    {
        Self(Arc::new(
            move |instance: ViewInstance, to: Arc<Route>, from: Arc<Route>| {
                f(instance, to, from).boxed()
            },
        ))
    }

    pub fn call(&self, instance: ViewInstance, to: Arc<Route>, from: Arc<Route>) -> GuardFuture {
        (self.0)(instance, to, from)
    }
}

impl fmt::Debug for InstanceGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("InstanceGuard")
    }
}

/// Post-navigation hook; cannot affect the navigation.
#[derive(Clone)]
pub struct AfterHook(Arc<dyn Fn(&Route, &Route) + Send + Sync>);

impl AfterHook {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Route, &Route) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, to: &Route, from: &Route) {
        (self.0)(to, from)
    }
}

impl fmt::Debug for AfterHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AfterHook")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bool() {
        assert!(matches!(GuardOutcome::from(true), GuardOutcome::Continue));
        assert!(matches!(GuardOutcome::from(false), GuardOutcome::Abort));
    }

    #[test]
    fn test_redirect_picks_up_replace_flag() {
        match GuardOutcome::redirect(RawLocation::path("/login").replacing()) {
            GuardOutcome::Redirect { to, replace } => {
                assert_eq!(to.path.as_deref(), Some("/login"));
                assert!(replace);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_guard_call() {
        let guard = NavigationGuard::new(|to: Arc<Route>, _from| async move {
            GuardOutcome::from(to.path != "/forbidden")
        });
        let from = Arc::new(Route::start());
        let allowed = Arc::new(Route::start());
        assert!(matches!(guard.call(allowed, from).await, GuardOutcome::Continue));
    }
}
