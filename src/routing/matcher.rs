//! Location matching and route resolution.
//!
//! # Responsibilities
//! - Resolve named targets, backfilling required params from the current route
//! - Scan path targets against the table in priority order
//! - Follow redirects and aliases to the record that is actually shown
//!
//! # Design Decisions
//! - Never fails: unknown names, bad redirects and unfillable params all
//!   resolve to a non-matching `Route` plus a warning
//! - The table is swapped atomically on `add_routes`; matching never locks
//! - Redirect chains are re-matched from scratch on every hop, bounded by
//!   `max_redirect_hops`

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::config::{MatchingConfig, RouteConfig};
use crate::location::normalize::prefix_hash;
use crate::location::path::{parse_path, resolve_path};
use crate::location::{normalize, Location, Query, RawLocation};
use crate::observability::metrics;
use crate::routing::error::RouteConfigError;
use crate::routing::pattern::{PathPattern, PatternOptions};
use crate::routing::record::{RecordKind, Redirect, RouteRecord};
use crate::routing::route::Route;
use crate::routing::table::RouteTable;

#[derive(Debug)]
pub struct Matcher {
    table: ArcSwap<RouteTable>,
    options: MatchingConfig,
    /// Serializes `add_routes` callers; readers never take it.
    write_lock: Mutex<()>,
}

impl Matcher {
    pub fn new(configs: &[RouteConfig], options: MatchingConfig) -> Result<Self, RouteConfigError> {
        let table = RouteTable::build(configs, &options)?;
        metrics::record_table_size(table.len());
        Ok(Self {
            table: ArcSwap::from_pointee(table),
            options,
            write_lock: Mutex::new(()),
        })
    }

    /// Merge more routes into the table. On error the table is unchanged.
    pub fn add_routes(&self, configs: &[RouteConfig]) -> Result<(), RouteConfigError> {
        let _guard = self.write_lock.lock();
        let next = self.table.load().extend(configs, &self.options)?;
        let size = next.len();
        self.table.store(Arc::new(next));
        metrics::record_table_size(size);
        tracing::info!(added = configs.len(), records = size, "Routes added");
        Ok(())
    }

    /// Snapshot of the current table.
    pub fn table(&self) -> Arc<RouteTable> {
        self.table.load_full()
    }

    pub fn options(&self) -> &MatchingConfig {
        &self.options
    }

    /// Resolve `raw` into a route. `current` supplies the base for relative
    /// targets and the params reused by named targets.
    pub fn match_route(
        &self,
        raw: impl Into<RawLocation>,
        current: Option<&Route>,
        redirected_from: Option<&Location>,
    ) -> Route {
        let table = self.table.load();
        let route = self.resolve(&table, &raw.into(), current, redirected_from, 0);
        metrics::record_match(route.is_matched());
        route
    }

    fn resolve(
        &self,
        table: &RouteTable,
        raw: &RawLocation,
        current: Option<&Route>,
        redirected_from: Option<&Location>,
        hops: usize,
    ) -> Route {
        let mut location = normalize(raw, current, false);

        if let Some(name) = location.name.clone() {
            let Some(record) = table.by_name(&name) else {
                tracing::warn!(name = %name, "Route with this name does not exist");
                return Route::new(None, &location, redirected_from);
            };

            let required = record.pattern.required_params();
            if let Some(current) = current {
                for (key, value) in &current.params {
                    if !location.params.contains_key(key) && required.contains(&key.as_str()) {
                        location.params.insert(key.clone(), value.clone());
                    }
                }
            }

            match record.pattern.fill(&location.params) {
                Ok(path) => location.path = Some(path),
                Err(e) => {
                    tracing::warn!(name = %name, error = %e, "Cannot resolve named route");
                    return Route::new(None, &location, redirected_from);
                }
            }
            return self.create_route(table, Some(record), location, redirected_from, hops);
        }

        if let Some(path) = location.path.clone() {
            for record in table.records() {
                if let Some(params) = record.pattern.captures(&path) {
                    location.params = params;
                    return self.create_route(table, Some(record), location, redirected_from, hops);
                }
            }
        }

        Route::new(None, &location, redirected_from)
    }

    fn create_route(
        &self,
        table: &RouteTable,
        record: Option<&Arc<RouteRecord>>,
        location: Location,
        redirected_from: Option<&Location>,
        hops: usize,
    ) -> Route {
        let Some(record) = record else {
            return Route::new(None, &location, redirected_from);
        };
        match &record.kind {
            RecordKind::Normal => Route::new(Some(record), &location, redirected_from),
            RecordKind::Redirect(redirect) => {
                let origin = redirected_from.unwrap_or(&location);
                self.redirect(table, record, redirect, origin, hops)
            }
            RecordKind::Alias { target } => {
                self.alias(table, target, location, redirected_from, hops)
            }
        }
    }

    fn redirect(
        &self,
        table: &RouteTable,
        record: &Arc<RouteRecord>,
        redirect: &Redirect,
        origin: &Location,
        hops: usize,
    ) -> Route {
        if hops >= self.options.max_redirect_hops {
            tracing::warn!(
                from = %origin.full_path(),
                hops,
                "Redirect chain exceeds the hop limit"
            );
            return Route::new(None, origin, None);
        }

        let target = match redirect {
            Redirect::Static(target) => Some(target.clone()),
            Redirect::Dynamic(f) => f.call(&Route::new(Some(record), origin, None)),
        };
        let Some(target) = target else {
            tracing::warn!(path = %record.path, "Invalid redirect option");
            return Route::new(None, origin, None);
        };

        let parsed = parse_path(target.path.as_deref().unwrap_or_default());
        let query = match (&target.query, parsed.query.is_empty()) {
            (Some(query), _) => query.clone(),
            (None, false) => Query::parse(&parsed.query),
            (None, true) => origin.query.clone(),
        };
        let hash = match (&target.hash, parsed.hash.is_empty()) {
            (Some(hash), _) => prefix_hash(hash.clone()),
            (None, false) => parsed.hash.clone(),
            (None, true) => origin.hash.clone(),
        };
        let params = target.params.clone().unwrap_or_else(|| origin.params.clone());

        let next = if let Some(name) = &target.name {
            if table.by_name(name).is_none() {
                tracing::warn!(name = %name, path = %record.path, "Redirect to a named route that does not exist");
            }
            RawLocation {
                name: Some(name.clone()),
                params: Some(params),
                query: Some(query),
                hash: Some(hash),
                normalized: true,
                ..RawLocation::default()
            }
        } else if target.path.is_some() {
            let raw_path = resolve_path(&parsed.path, record.parent_path(), true);
            let filled = PathPattern::compile(&raw_path, PatternOptions::default())
                .map_err(|e| e.to_string())
                .and_then(|pattern| pattern.fill(&params).map_err(|e| e.to_string()));
            match filled {
                Ok(path) => RawLocation {
                    path: Some(path),
                    query: Some(query),
                    hash: Some(hash),
                    normalized: true,
                    ..RawLocation::default()
                },
                Err(e) => {
                    tracing::warn!(path = %record.path, error = %e, "Cannot resolve redirect path");
                    return Route::new(None, origin, None);
                }
            }
        } else {
            tracing::warn!(path = %record.path, "Redirect target has neither a path nor a name");
            return Route::new(None, origin, None);
        };

        tracing::debug!(from = %origin.full_path(), to = %next.describe(), "Following redirect");
        self.resolve(table, &next, None, Some(origin), hops + 1)
    }

    fn alias(
        &self,
        table: &RouteTable,
        target: &str,
        mut location: Location,
        redirected_from: Option<&Location>,
        hops: usize,
    ) -> Route {
        let filled = match table.by_path(target) {
            Some(real) => real.pattern.fill(&location.params).map_err(|e| e.to_string()),
            None => PathPattern::compile(target, PatternOptions::default())
                .map_err(|e| e.to_string())
                .and_then(|pattern| pattern.fill(&location.params).map_err(|e| e.to_string())),
        };
        let aliased_path = match filled {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(target = %target, error = %e, "Cannot resolve alias target");
                return Route::new(None, &location, redirected_from);
            }
        };

        let aliased = self.resolve(table, &RawLocation::path(aliased_path).as_normalized(), None, None, hops);
        match aliased.matched.last() {
            Some(real) => {
                location.params = aliased.params.clone();
                Route::new(Some(real), &location, redirected_from)
            }
            None => Route::new(None, &location, redirected_from),
        }
    }
}
