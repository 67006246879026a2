//! Metrics collection.
//!
//! # Metrics
//! - `router_matches_total` (counter): resolutions by `outcome` (matched, unmatched)
//! - `router_navigations_total` (counter): terminal navigation outcomes by `outcome`
//! - `router_route_table_size` (gauge): records in the current table

use metrics::{counter, gauge};

pub fn record_match(matched: bool) {
    let outcome = if matched { "matched" } else { "unmatched" };
    counter!("router_matches_total", "outcome" => outcome).increment(1);
}

pub fn record_navigation(outcome: &'static str) {
    counter!("router_navigations_total", "outcome" => outcome).increment(1);
}

pub fn record_table_size(records: usize) {
    gauge!("router_route_table_size").set(records as f64);
}
