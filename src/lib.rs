//! Client-side navigation router library

pub mod config;
pub mod location;
pub mod navigation;
pub mod observability;
pub mod router;
pub mod routing;

pub use config::schema::{RouteConfig, RouterConfig};
pub use location::{Location, RawLocation};
pub use navigation::{
    AfterHook, Component, GuardOutcome, HistoryBackend, InstanceGuard, LazyComponent, NavigationFailure,
    NavigationGuard,
};
pub use router::{Resolved, Router};
pub use routing::Route;
