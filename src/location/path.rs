//! Path string helpers: splitting, cleaning and relative resolution.

/// A raw path split into its components.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPath {
    pub path: String,
    /// Query without the leading `?`.
    pub query: String,
    /// Hash including the leading `#`.
    pub hash: String,
}

/// Split `"/a/b?x=1#top"` into path, query and hash.
pub fn parse_path(raw: &str) -> ParsedPath {
    let (rest, hash) = match raw.find('#') {
        Some(idx) => (&raw[..idx], raw[idx..].to_string()),
        None => (raw, String::new()),
    };
    let (path, query) = match rest.find('?') {
        Some(idx) => (&rest[..idx], rest[idx + 1..].to_string()),
        None => (rest, String::new()),
    };
    ParsedPath {
        path: path.to_string(),
        query,
        hash,
    }
}

/// Collapse runs of `/` into a single separator.
pub fn clean_path(path: &str) -> String {
    let mut cleaned = String::with_capacity(path.len());
    let mut last_slash = false;
    for c in path.chars() {
        if c == '/' {
            if !last_slash {
                cleaned.push(c);
            }
            last_slash = true;
        } else {
            cleaned.push(c);
            last_slash = false;
        }
    }
    cleaned
}

/// Resolve `relative` against `base`.
///
/// Without `append` the last segment of `base` is replaced (sibling semantics);
/// with it the relative path is appended below `base`.
pub fn resolve_path(relative: &str, base: &str, append: bool) -> String {
    if relative.starts_with('/') {
        return relative.to_string();
    }
    if relative.starts_with('?') || relative.starts_with('#') {
        return format!("{base}{relative}");
    }

    let mut stack: Vec<&str> = base.split('/').collect();
    if !append || stack.last().is_some_and(|s| s.is_empty()) {
        stack.pop();
    }

    for segment in relative.trim_start_matches('/').split('/') {
        match segment {
            ".." => {
                stack.pop();
            }
            "." => {}
            other => stack.push(other),
        }
    }

    if stack.first() != Some(&"") {
        stack.insert(0, "");
    }
    let resolved = stack.join("/");
    if resolved.is_empty() {
        "/".to_string()
    } else {
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_path() {
        let parsed = parse_path("/search?q=rust&page=2#results");
        assert_eq!(parsed.path, "/search");
        assert_eq!(parsed.query, "q=rust&page=2");
        assert_eq!(parsed.hash, "#results");

        let bare = parse_path("/plain");
        assert_eq!(bare.path, "/plain");
        assert!(bare.query.is_empty());
        assert!(bare.hash.is_empty());
    }

    #[test]
    fn test_hash_before_query_marker() {
        let parsed = parse_path("/a#frag?not-a-query");
        assert_eq!(parsed.path, "/a");
        assert!(parsed.query.is_empty());
        assert_eq!(parsed.hash, "#frag?not-a-query");
    }

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path("//a///b/"), "/a/b/");
        assert_eq!(clean_path("/a/b"), "/a/b");
    }

    #[test]
    fn test_resolve_sibling_and_append() {
        assert_eq!(resolve_path("c", "/a/b", false), "/a/c");
        assert_eq!(resolve_path("c", "/a/b", true), "/a/b/c");
        assert_eq!(resolve_path("c", "/a/b/", false), "/a/b/c");
    }

    #[test]
    fn test_resolve_parent_segments() {
        assert_eq!(resolve_path("../c", "/a/b", false), "/c");
        assert_eq!(resolve_path("./c", "/a/b", false), "/a/c");
        assert_eq!(resolve_path("../../..", "/a/b", false), "/");
    }

    #[test]
    fn test_resolve_absolute_and_query_only() {
        assert_eq!(resolve_path("/x", "/a/b", false), "/x");
        assert_eq!(resolve_path("?q=1", "/a/b", false), "/a/b?q=1");
    }
}
