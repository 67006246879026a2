//! Global hook registries.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::navigation::guard::{AfterHook, NavigationGuard};

static NEXT_HOOK_ID: AtomicU64 = AtomicU64::new(1);

/// Handle returned by hook registration, used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

/// Hooks in registration order.
#[derive(Debug)]
pub struct HookList<T> {
    entries: RwLock<Vec<(HookId, T)>>,
}

impl<T> Default for HookList<T> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }
}

impl<T: Clone> HookList<T> {
    pub fn register(&self, hook: T) -> HookId {
        let id = HookId(NEXT_HOOK_ID.fetch_add(1, Ordering::Relaxed));
        self.entries.write().push((id, hook));
        id
    }

    pub fn remove(&self, id: HookId) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|(entry, _)| *entry != id);
        entries.len() != before
    }

    /// Copy of the hooks registered right now.
    pub fn snapshot(&self) -> Vec<T> {
        self.entries.read().iter().map(|(_, hook)| hook.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[derive(Debug, Default)]
pub struct Hooks {
    pub before_each: HookList<NavigationGuard>,
    pub before_resolve: HookList<NavigationGuard>,
    pub after_each: HookList<AfterHook>,
}

impl Hooks {
    /// Unregister from whichever list holds `id`.
    pub fn remove(&self, id: HookId) -> bool {
        self.before_each.remove(id) || self.before_resolve.remove(id) || self.after_each.remove(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_remove() {
        let hooks = Hooks::default();
        let first = hooks.after_each.register(AfterHook::new(|_, _| {}));
        let second = hooks.after_each.register(AfterHook::new(|_, _| {}));
        assert_ne!(first, second);
        assert_eq!(hooks.after_each.len(), 2);

        assert!(hooks.remove(first));
        assert!(!hooks.remove(first));
        assert_eq!(hooks.after_each.snapshot().len(), 1);
        assert!(hooks.before_each.is_empty());
    }
}
