//! Matched-chain diffing.

use std::sync::Arc;

use crate::routing::record::RouteRecord;

/// How two matched chains relate.
#[derive(Debug, Default)]
pub struct RecordDiff {
    /// Shared prefix, kept alive across the navigation.
    pub updated: Vec<Arc<RouteRecord>>,
    /// Records of the target after the divergence point.
    pub activated: Vec<Arc<RouteRecord>>,
    /// Records of the current route after the divergence point.
    pub deactivated: Vec<Arc<RouteRecord>>,
}

/// Split at the first index where the chains stop sharing records by identity.
pub fn resolve_queue(current: &[Arc<RouteRecord>], next: &[Arc<RouteRecord>]) -> RecordDiff {
    let shared = current
        .iter()
        .zip(next)
        .take_while(|(a, b)| Arc::ptr_eq(a, b))
        .count();

    RecordDiff {
        updated: next[..shared].to_vec(),
        activated: next[shared..].to_vec(),
        deactivated: current[shared..].to_vec(),
    }
}
