//! Seam towards the history collaborator (URL bar, back/forward).

use crate::routing::route::Route;

/// A history transport. The router works without one; when present it is
/// asked to reflect committed routes and to move through history.
pub trait HistoryBackend: Send + Sync {
    /// Full path (path + query + hash) the transport currently shows.
    fn current_location(&self) -> String;

    /// Move `n` entries through history.
    fn go(&self, n: i32);

    /// Add an entry for `full_path`.
    fn push_url(&self, full_path: &str);

    /// Overwrite the current entry with `full_path`.
    fn replace_url(&self, full_path: &str);
}

/// Make the transport show `current`, pushing or replacing only if it differs.
pub fn ensure_url(backend: &dyn HistoryBackend, current: &Route, push: bool) {
    if backend.current_location() == current.full_path {
        return;
    }
    if push {
        backend.push_url(&current.full_path);
    } else {
        backend.replace_url(&current.full_path);
    }
}
