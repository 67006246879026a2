//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! matcher, table, transition engine produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters and gauges via `metrics`)
//!
//! Consumers:
//!     → whatever subscriber / recorder the host installs
//! ```
//!
//! # Design Decisions
//! - The library never installs a metrics recorder; without one the
//!   macros are no-ops
//! - Diagnostics are log events only and never change behavior

pub mod logging;
pub mod metrics;
