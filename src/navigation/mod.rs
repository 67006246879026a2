//! Navigation subsystem: the transition engine and its seams.
//!
//! # Data Flow
//! ```text
//! navigate(raw)
//!     → Matcher::match_route (with the current route as context)
//!     → duplicate check
//!     → diff.rs (updated / activated / deactivated by record identity)
//!     → queue 1: leave → before_each → update → before_enter → lazy components
//!     → queue 2: enter → before_resolve
//!     → commit: current, listener, after_each, history, ready callbacks
//!     → view.rs polls for instances wanted by enter guards
//! ```
//!
//! # Design Decisions
//! - Guards return a `GuardOutcome` future instead of calling `next`
//! - Cancellation is cooperative: a superseded navigation stops at its next
//!   step and never commits
//! - No timeouts: a guard that never resolves stalls its navigation until a
//!   newer one supersedes it
//! - The history and rendering collaborators are traits and side tables,
//!   never owned state

pub mod component;
pub mod diff;
pub mod failure;
pub mod guard;
pub mod history;
pub mod hooks;
pub mod transition;
pub mod view;

pub use component::{Component, ComponentSlot, LazyComponent};
pub use failure::{NavigationFailure, RuntimeUnavailable};
pub use guard::{AfterHook, GuardError, GuardOutcome, InstanceGuard, NavigationGuard};
pub use history::HistoryBackend;
pub use hooks::HookId;
pub use view::{InstanceRegistry, Props, PropsFn, PropsSpec, ViewBinding, ViewInstance};
