//! Route table construction.
//!
//! # Responsibilities
//! - Flatten a nested route config into records with absolute paths
//! - Keep match priority: registration order, wildcards last
//! - Merge additional configs into an existing table
//!
//! # Design Decisions
//! - First registration of a path or a name wins; later ones are dropped
//! - Children are registered before their parent, so a default child
//!   (empty path) takes precedence over its parent at the same URL
//! - Aliases are sibling records pointing at the real record's path
//! - A failed build leaves the seed table untouched

use indexmap::IndexMap;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{MatchingConfig, RouteConfig};
use crate::location::path::clean_path;
use crate::routing::error::RouteConfigError;
use crate::routing::pattern::PathPattern;
use crate::routing::record::{RecordId, RecordKind, RouteRecord};

#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    path_list: Vec<String>,
    path_map: HashMap<String, Arc<RouteRecord>>,
    name_map: HashMap<String, Arc<RouteRecord>>,
}

impl RouteTable {
    pub fn build(configs: &[RouteConfig], options: &MatchingConfig) -> Result<Self, RouteConfigError> {
        Self::default().extend(configs, options)
    }

    /// A new table holding every record of `self` plus those from `configs`.
    pub fn extend(&self, configs: &[RouteConfig], options: &MatchingConfig) -> Result<Self, RouteConfigError> {
        let mut table = self.clone();
        for config in configs {
            table.add_record(config, None, None, options)?;
        }

        let path_map = &table.path_map;
        table
            .path_list
            .sort_by_key(|path| path_map.get(path).is_some_and(|r| r.is_wildcard()));

        tracing::debug!(
            records = table.path_list.len(),
            names = table.name_map.len(),
            "Route table built"
        );
        Ok(table)
    }

    /// Records in match priority order.
    pub fn records(&self) -> impl Iterator<Item = &Arc<RouteRecord>> {
        self.path_list.iter().filter_map(|path| self.path_map.get(path))
    }

    pub fn by_path(&self, path: &str) -> Option<&Arc<RouteRecord>> {
        self.path_map.get(path)
    }

    pub fn by_name(&self, name: &str) -> Option<&Arc<RouteRecord>> {
        self.name_map.get(name)
    }

    pub fn len(&self) -> usize {
        self.path_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.path_list.is_empty()
    }

    fn add_record(
        &mut self,
        config: &RouteConfig,
        parent: Option<&Arc<RouteRecord>>,
        alias_of: Option<&str>,
        options: &MatchingConfig,
    ) -> Result<(), RouteConfigError> {
        let raw_path = config
            .path
            .as_deref()
            .ok_or_else(|| RouteConfigError::MissingPath {
                name: config.name.clone(),
            })?;

        if parent.is_none() && !raw_path.starts_with('/') && !raw_path.starts_with('*') {
            tracing::warn!(path = %raw_path, "Non-nested routes must include a leading slash");
        }

        let pattern_options = config.pattern_options(options);
        let path = normalize_record_path(raw_path, parent, pattern_options.strict);
        let pattern = PathPattern::compile(&path, pattern_options)?;

        if let Some(name) = &config.name {
            if config.redirect.is_none() && config.children.iter().any(RouteConfig::is_default_child) {
                tracing::warn!(
                    name = %name,
                    "Named route has a default child; navigating by this name will not render the default child"
                );
            }
        }

        let kind = match (&config.redirect, alias_of) {
            (Some(redirect), _) => RecordKind::Redirect(redirect.clone()),
            (None, Some(target)) => RecordKind::Alias {
                target: target.to_string(),
            },
            (None, None) => RecordKind::Normal,
        };

        let mut components = config.components.clone();
        if components.is_empty() {
            if let Some(component) = &config.component {
                components.insert("default".to_string(), component.clone());
            }
        }

        let mut props = IndexMap::new();
        if let Some(spec) = &config.props {
            props.insert("default".to_string(), spec.clone());
        }
        props.extend(config.slot_props.iter().map(|(k, v)| (k.clone(), v.clone())));

        let record = Arc::new(RouteRecord {
            id: RecordId::next(),
            path,
            pattern,
            components,
            name: config.name.clone(),
            parent: parent.cloned(),
            kind,
            before_enter: config.before_enter.clone(),
            meta: config.meta.clone(),
            props,
            aliases: config.alias.clone(),
        });

        for child in &config.children {
            let child_alias = alias_of.map(|base| {
                clean_path(&format!("{}/{}", base, child.path.as_deref().unwrap_or_default()))
            });
            self.add_record(child, Some(&record), child_alias.as_deref(), options)?;
        }

        if !self.path_map.contains_key(&record.path) {
            self.path_list.push(record.path.clone());
            self.path_map.insert(record.path.clone(), record.clone());
        }

        for alias in &config.alias {
            if alias == raw_path {
                tracing::warn!(path = %raw_path, "Alias is identical to the route path, skipping");
                continue;
            }
            let alias_config = RouteConfig {
                path: Some(alias.clone()),
                children: config.children.clone(),
                case_sensitive: config.case_sensitive,
                path_to_regexp_options: config.path_to_regexp_options,
                ..RouteConfig::default()
            };
            self.add_record(&alias_config, parent, Some(&record.path), options)?;
        }

        if let Some(name) = &config.name {
            match self.name_map.entry(name.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(record);
                }
                Entry::Occupied(_) if alias_of.is_none() => {
                    tracing::warn!(name = %name, path = %record.path, "Duplicate named route definition");
                }
                Entry::Occupied(_) => {}
            }
        }
        Ok(())
    }
}

/// Absolute template for a node: joined onto the parent unless already absolute.
fn normalize_record_path(path: &str, parent: Option<&Arc<RouteRecord>>, strict: bool) -> String {
    let path = if strict || path == "/" {
        path
    } else {
        path.strip_suffix('/').unwrap_or(path)
    };

    let joined = match parent {
        Some(parent) if !path.starts_with('/') => clean_path(&format!("{}/{}", parent.path, path)),
        _ => path.to_string(),
    };

    if joined.is_empty() {
        "/".to_string()
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(table: &RouteTable) -> Vec<&str> {
        table.records().map(|r| r.path.as_str()).collect()
    }

    fn build(configs: &[RouteConfig]) -> RouteTable {
        RouteTable::build(configs, &MatchingConfig::default()).unwrap()
    }

    #[test]
    fn test_nested_paths_and_child_first_order() {
        let table = build(&[RouteConfig::new("/users/").children(vec![
            RouteConfig::new(""),
            RouteConfig::new(":id"),
            RouteConfig::new("/absolute"),
        ])]);
        assert_eq!(paths(&table), vec!["/users/", "/users/:id", "/absolute", "/users"]);

        let child = table.by_path("/users/:id").unwrap();
        assert_eq!(child.parent.as_ref().unwrap().path, "/users");
        assert_eq!(child.chain().len(), 2);
    }

    #[test]
    fn test_wildcards_sorted_last_stably() {
        let table = build(&[
            RouteConfig::new("*"),
            RouteConfig::new("/a"),
            RouteConfig::new("/files/*"),
            RouteConfig::new("/b"),
        ]);
        assert_eq!(paths(&table), vec!["/a", "/b", "*", "/files/*"]);
    }

    #[test]
    fn test_first_registration_wins() {
        let table = build(&[
            RouteConfig::new("/a").name("first"),
            RouteConfig::new("/a").name("second"),
            RouteConfig::new("/b").name("first"),
        ]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.by_path("/a").unwrap().name.as_deref(), Some("first"));
        assert_eq!(table.by_name("first").unwrap().path, "/a");
        assert!(table.by_name("second").is_some());
    }

    #[test]
    fn test_alias_records_and_children() {
        let table = build(&[RouteConfig::new("/home")
            .alias("/start")
            .child(RouteConfig::new("news").name("news"))]);
        assert_eq!(paths(&table), vec!["/home/news", "/home", "/start/news", "/start"]);

        match &table.by_path("/start").unwrap().kind {
            RecordKind::Alias { target } => assert_eq!(target, "/home"),
            other => panic!("unexpected kind {other:?}"),
        }
        match &table.by_path("/start/news").unwrap().kind {
            RecordKind::Alias { target } => assert_eq!(target, "/home/news"),
            other => panic!("unexpected kind {other:?}"),
        }
        assert_eq!(table.by_name("news").unwrap().path, "/home/news");
    }

    #[test]
    fn test_missing_path_fails() {
        let config = RouteConfig {
            name: Some("nameless".into()),
            ..RouteConfig::default()
        };
        let err = RouteTable::build(&[config], &MatchingConfig::default()).unwrap_err();
        assert_eq!(
            err,
            RouteConfigError::MissingPath {
                name: Some("nameless".into())
            }
        );
    }

    #[test]
    fn test_failed_extend_keeps_seed() {
        let table = build(&[RouteConfig::new("/a")]);
        let result = table.extend(
            &[RouteConfig::new("/b"), RouteConfig::new("/c/:x/:x")],
            &MatchingConfig::default(),
        );
        assert!(matches!(result, Err(RouteConfigError::DuplicateParam { .. })));
        assert_eq!(paths(&table), vec!["/a"]);
    }

    #[test]
    fn test_extend_is_additive() {
        let table = build(&[RouteConfig::new("/a"), RouteConfig::new("*")]);
        let extended = table
            .extend(&[RouteConfig::new("/b"), RouteConfig::new("/a").name("dup")], &MatchingConfig::default())
            .unwrap();
        assert_eq!(paths(&extended), vec!["/a", "/b", "*"]);
        assert!(Arc::ptr_eq(
            table.by_path("/a").unwrap(),
            extended.by_path("/a").unwrap()
        ));
    }

    #[test]
    fn test_strict_keeps_trailing_slash() {
        let table = build(&[RouteConfig::new("/strict/").strict(true), RouteConfig::new("/loose/")]);
        assert_eq!(paths(&table), vec!["/strict/", "/loose"]);
    }
}
