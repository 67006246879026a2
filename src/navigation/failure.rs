//! Why a navigation did not complete.

use thiserror::Error;

use crate::navigation::guard::GuardError;

/// Terminal outcome of a navigation that did not commit.
#[derive(Debug, Clone, Error)]
pub enum NavigationFailure {
    /// Target equals the current route.
    #[error("avoided redundant navigation to current location \"{0}\"")]
    Duplicated(String),

    /// Superseded by a newer navigation.
    #[error("navigation from \"{from}\" to \"{to}\" was cancelled by a newer navigation")]
    Cancelled { from: String, to: String },

    /// A guard stopped the navigation.
    #[error("navigation from \"{from}\" to \"{to}\" was aborted by a guard")]
    Aborted { from: String, to: String },

    /// A guard redirected elsewhere.
    #[error("navigation from \"{from}\" to \"{to}\" was redirected by a guard")]
    Redirected { from: String, to: String },

    /// A guard failed or panicked.
    #[error("navigation guard failed: {0}")]
    Errored(GuardError),
}

impl NavigationFailure {
    /// Metric / log label.
    pub fn label(&self) -> &'static str {
        match self {
            NavigationFailure::Duplicated(_) => "duplicated",
            NavigationFailure::Cancelled { .. } => "cancelled",
            NavigationFailure::Aborted { .. } => "aborted",
            NavigationFailure::Redirected { .. } => "redirected",
            NavigationFailure::Errored(_) => "errored",
        }
    }

    /// Cancelled and redirected navigations hand over to another navigation,
    /// so they do not decide the router's initial readiness.
    pub(crate) fn settles_ready(&self) -> bool {
        !matches!(
            self,
            NavigationFailure::Cancelled { .. } | NavigationFailure::Redirected { .. }
        )
    }
}

/// Payload of a guard that panicked.
#[derive(Debug, Error)]
#[error("navigation guard panicked: {0}")]
pub struct GuardPanic(pub String);

/// No Tokio runtime was available to drive a navigation.
#[derive(Debug, Error)]
#[error("no Tokio runtime available to run the navigation")]
pub struct RuntimeUnavailable;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_labels_and_display() {
        let failure = NavigationFailure::Aborted {
            from: "/".into(),
            to: "/admin".into(),
        };
        assert_eq!(failure.label(), "aborted");
        assert!(failure.to_string().contains("\"/admin\""));

        let errored = NavigationFailure::Errored(Arc::new(GuardPanic("boom".into())));
        assert_eq!(errored.to_string(), "navigation guard failed: navigation guard panicked: boom");
        assert!(errored.settles_ready());
        assert!(!NavigationFailure::Cancelled {
            from: "/".into(),
            to: "/x".into()
        }
        .settles_ready());
    }
}
