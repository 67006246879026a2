//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup, and on add_routes):
//!     RouteConfig[]
//!     → pattern.rs (compile templates to anchored regexes + param slots)
//!     → table.rs (flatten tree, register paths/names, wildcards last)
//!     → published through ArcSwap
//!
//! Resolution:
//!     RawLocation + current Route
//!     → location::normalize
//!     → matcher.rs (by name, else linear path scan)
//!     → redirect / alias / normal classification
//!     → route.rs (immutable Route, matched root-first)
//! ```
//!
//! # Design Decisions
//! - Deterministic: same table and input always yield the same route
//! - First match wins (registration order, wildcards last)
//! - Records are immutable once registered; instance bindings live elsewhere

pub mod error;
pub mod matcher;
pub mod pattern;
pub mod record;
pub mod route;
pub mod table;

pub use error::{ParamFillError, RouteConfigError};
pub use matcher::Matcher;
pub use pattern::FALLBACK_PARAM;
pub use record::{RecordId, RecordKind, RecordSummary, Redirect, RedirectFn, RouteRecord};
pub use route::Route;
pub use table::RouteTable;
