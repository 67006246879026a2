//! Raw target → canonical [`Location`].

use crate::location::path::{parse_path, resolve_path};
use crate::location::{Location, Params, Query, RawLocation};
use crate::routing::route::Route;

/// Normalize a raw navigation target.
///
/// Never mutates its inputs and never fails: targets that cannot be resolved
/// relative to `current` fall back to resolution against `/`.
pub fn normalize(raw: &RawLocation, current: Option<&Route>, append: bool) -> Location {
    if raw.normalized {
        return Location {
            name: raw.name.clone(),
            path: raw.path.clone(),
            query: raw.query.clone().unwrap_or_default(),
            hash: raw.hash.clone().unwrap_or_default(),
            params: raw.params.clone().unwrap_or_default(),
            normalized: true,
        };
    }

    if let Some(name) = &raw.name {
        return Location {
            name: Some(name.clone()),
            path: raw.path.clone(),
            query: raw.query.clone().unwrap_or_default(),
            hash: raw.hash.clone().map(prefix_hash).unwrap_or_default(),
            params: raw.params.clone().unwrap_or_default(),
            normalized: false,
        };
    }

    // Params-only target: stay on the current route with new params.
    if raw.path.is_none() {
        if let (Some(params), Some(current)) = (&raw.params, current) {
            return relative_params(raw, params, current);
        }
    }

    let parsed = parse_path(raw.path.as_deref().unwrap_or(""));
    let base = current.map(|c| c.path.as_str()).unwrap_or("/");
    let path = if parsed.path.is_empty() {
        base.to_string()
    } else {
        resolve_path(&parsed.path, base, append || raw.append)
    };

    let parsed_query = Query::parse(&parsed.query);
    let query = match &raw.query {
        Some(extra) => parsed_query.merged_with(extra),
        None => parsed_query,
    };

    let hash = match &raw.hash {
        Some(h) if !h.is_empty() => prefix_hash(h.clone()),
        _ => parsed.hash,
    };

    Location {
        name: None,
        path: Some(path),
        query,
        hash,
        params: Params::new(),
        normalized: true,
    }
}

fn relative_params(raw: &RawLocation, params: &Params, current: &Route) -> Location {
    let mut merged = current.params.clone();
    merged.extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));

    let mut location = Location {
        name: None,
        path: None,
        query: raw.query.clone().unwrap_or_default(),
        hash: raw.hash.clone().map(prefix_hash).unwrap_or_default(),
        params: Params::new(),
        normalized: true,
    };

    if let Some(name) = &current.name {
        location.name = Some(name.clone());
        location.params = merged;
    } else if let Some(record) = current.matched.last() {
        match record.pattern.fill(&merged) {
            Ok(path) => location.path = Some(path),
            Err(e) => {
                tracing::warn!(path = %current.path, error = %e, "Cannot fill params for relative navigation");
            }
        }
    } else {
        tracing::warn!("Relative params navigation requires a matched current route");
    }
    location
}

pub(crate) fn prefix_hash(hash: String) -> String {
    if hash.is_empty() || hash.starts_with('#') {
        hash
    } else {
        format!("#{hash}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MatchingConfig, RouteConfig};
    use crate::routing::matcher::Matcher;

    fn current(path: &str) -> Route {
        let matcher = Matcher::new(
            &[
                RouteConfig::new("/users/:id").name("user"),
                RouteConfig::new("/files/:dir/list"),
            ],
            MatchingConfig::default(),
        )
        .unwrap();
        matcher.match_route(path, None, None)
    }

    #[test]
    fn test_string_target() {
        let loc = normalize(&RawLocation::from("/a/b?x=1#top"), None, false);
        assert_eq!(loc.path.as_deref(), Some("/a/b"));
        assert_eq!(loc.query.first("x"), Some("1"));
        assert_eq!(loc.hash, "#top");
        assert!(loc.normalized);
    }

    #[test]
    fn test_relative_without_current_resolves_from_root() {
        let loc = normalize(&RawLocation::from("about"), None, false);
        assert_eq!(loc.path.as_deref(), Some("/about"));
    }

    #[test]
    fn test_relative_against_current() {
        let cur = current("/users/7");
        let sibling = normalize(&RawLocation::from("8"), Some(&cur), false);
        assert_eq!(sibling.path.as_deref(), Some("/users/8"));

        let child = normalize(&RawLocation::from("posts"), Some(&cur), true);
        assert_eq!(child.path.as_deref(), Some("/users/7/posts"));

        let flagged = normalize(&RawLocation::from("posts").appending(), Some(&cur), false);
        assert_eq!(flagged.path.as_deref(), Some("/users/7/posts"));
    }

    #[test]
    fn test_explicit_query_and_hash_override() {
        let raw = RawLocation::from("/a?x=1&y=2")
            .with_query("y", "3")
            .with_hash("sec");
        let loc = normalize(&raw, None, false);
        assert_eq!(loc.query.first("x"), Some("1"));
        assert_eq!(loc.query.first("y"), Some("3"));
        assert_eq!(loc.hash, "#sec");
    }

    #[test]
    fn test_named_target_passes_through() {
        let raw = RawLocation::named("user").with_param("id", "1");
        let loc = normalize(&raw, None, false);
        assert_eq!(loc.name.as_deref(), Some("user"));
        assert_eq!(loc.params.get("id").map(String::as_str), Some("1"));
        assert!(loc.path.is_none());
        // input untouched
        assert_eq!(raw.params.as_ref().map(|p| p.len()), Some(1));
    }

    #[test]
    fn test_relative_params_reuse_current_name() {
        let cur = current("/users/7");
        let raw = RawLocation::default().with_param("id", "9");
        let loc = normalize(&raw, Some(&cur), false);
        assert_eq!(loc.name.as_deref(), Some("user"));
        assert_eq!(loc.params.get("id").map(String::as_str), Some("9"));
    }

    #[test]
    fn test_relative_params_fill_unnamed_record() {
        let cur = current("/files/docs/list");
        let raw = RawLocation::default().with_param("dir", "img");
        let loc = normalize(&raw, Some(&cur), false);
        assert_eq!(loc.path.as_deref(), Some("/files/img/list"));
    }

    #[test]
    fn test_normalized_input_passes_through() {
        let raw = RawLocation::from(Location {
            path: Some("weird/relative".into()),
            normalized: true,
            ..Location::default()
        });
        let loc = normalize(&raw, None, false);
        assert_eq!(loc.path.as_deref(), Some("weird/relative"));
    }
}
