//! Shared utilities for integration tests.

#![allow(dead_code)]

use nav_router::config::{EngineConfig, MatchingConfig};
use nav_router::navigation::GuardOutcome;
use nav_router::{HistoryBackend, NavigationGuard, RouteConfig, Router};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// One call the router made into the history backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryCall {
    Push(String),
    Replace(String),
    Go(i32),
}

/// History backend that records every call and tracks the shown location.
#[derive(Debug, Default)]
pub struct RecordingHistory {
    pub location: Mutex<String>,
    pub calls: Mutex<Vec<HistoryCall>>,
}

impl RecordingHistory {
    pub fn at(location: &str) -> Arc<Self> {
        Arc::new(Self {
            location: Mutex::new(location.to_string()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<HistoryCall> {
        self.calls.lock().clone()
    }

    pub fn shown(&self) -> String {
        self.location.lock().clone()
    }
}

impl HistoryBackend for RecordingHistory {
    fn current_location(&self) -> String {
        self.location.lock().clone()
    }

    fn go(&self, n: i32) {
        self.calls.lock().push(HistoryCall::Go(n));
    }

    fn push_url(&self, full_path: &str) {
        *self.location.lock() = full_path.to_string();
        self.calls.lock().push(HistoryCall::Push(full_path.to_string()));
    }

    fn replace_url(&self, full_path: &str) {
        *self.location.lock() = full_path.to_string();
        self.calls.lock().push(HistoryCall::Replace(full_path.to_string()));
    }
}

/// Router with a fast poll interval so deferred callbacks settle quickly.
pub fn router(routes: Vec<RouteConfig>) -> Router {
    Router::with_options(
        &routes,
        MatchingConfig::default(),
        EngineConfig { poll_interval_ms: 1 },
    )
    .unwrap()
}

/// Thread-safe event log for asserting call order.
#[derive(Debug, Clone, Default)]
pub struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

/// Guard that logs its label and continues.
pub fn logging_guard(log: &Log, label: &'static str) -> NavigationGuard {
    let log = log.clone();
    NavigationGuard::new(move |_to, _from| {
        log.push(label);
        async { GuardOutcome::Continue }
    })
}

/// A guard that blocks until released, for pausing a navigation mid-flight.
#[derive(Clone, Default)]
pub struct Gate {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

impl Gate {
    /// Guard that waits on this gate, then returns `outcome`.
    pub fn guard(&self, outcome: fn() -> GuardOutcome) -> NavigationGuard {
        let gate = self.clone();
        NavigationGuard::new(move |_to, _from| {
            let gate = gate.clone();
            async move {
                gate.entered.notify_one();
                gate.release.notified().await;
                outcome()
            }
        })
    }

    /// Wait until some navigation is parked on the gate.
    pub async fn entered(&self) {
        tokio::time::timeout(Duration::from_secs(5), self.entered.notified())
            .await
            .expect("guard never reached the gate");
    }

    pub fn open(&self) {
        self.release.notify_one();
    }
}
