//! Query string parsing and serialization.
//!
//! # Design Decisions
//! - Keys keep insertion order (`IndexMap`), equality ignores order
//! - A key without `=` is a flag, distinct from an empty value
//! - Repeated keys collapse into a list, in order of appearance

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Value stored under a single query key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
    /// `?key=value`
    Value(String),
    /// `?key=a&key=b`; `None` entries are flags.
    List(Vec<Option<String>>),
    /// `?key`
    Flag,
}

impl QueryValue {
    /// First concrete value, if any.
    pub fn first(&self) -> Option<&str> {
        match self {
            QueryValue::Value(v) => Some(v),
            QueryValue::List(values) => values.iter().flatten().next().map(String::as_str),
            QueryValue::Flag => None,
        }
    }

    fn push(&mut self, value: Option<String>) {
        let existing = match std::mem::replace(self, QueryValue::Flag) {
            QueryValue::Value(v) => vec![Some(v)],
            QueryValue::Flag => vec![None],
            QueryValue::List(values) => values,
        };
        let mut values = existing;
        values.push(value);
        *self = QueryValue::List(values);
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Value(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Value(value)
    }
}

/// Ordered, multi-valued query mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Query(IndexMap<String, QueryValue>);

impl Query {
    /// Create an empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw query string. A leading `?`, `#` or `&` is ignored.
    pub fn parse(raw: &str) -> Self {
        let mut query = Query::new();
        let trimmed = raw.trim();
        let trimmed = trimmed
            .strip_prefix(['?', '#', '&'])
            .unwrap_or(trimmed);
        if trimmed.is_empty() {
            return query;
        }

        for param in trimmed.split('&') {
            let param = param.replace('+', " ");
            let (key, value) = match param.split_once('=') {
                Some((k, v)) => (decode(k), Some(decode(v))),
                None => (decode(&param), None),
            };
            query.append(key, value);
        }
        query
    }

    /// Serialize to `?a=1&b=2`, or an empty string when there is nothing to write.
    pub fn stringify(&self) -> String {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(key, value)| match value {
                QueryValue::Flag => encode(key),
                QueryValue::Value(v) => format!("{}={}", encode(key), encode(v)),
                QueryValue::List(values) => values
                    .iter()
                    .map(|v| match v {
                        Some(v) => format!("{}={}", encode(key), encode(v)),
                        None => encode(key),
                    })
                    .collect::<Vec<_>>()
                    .join("&"),
            })
            .filter(|part| !part.is_empty())
            .collect();

        if parts.is_empty() {
            String::new()
        } else {
            format!("?{}", parts.join("&"))
        }
    }

    /// Insert or replace a key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<QueryValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Add a value under `key`, turning repeated keys into a list.
    pub fn append(&mut self, key: impl Into<String>, value: Option<String>) {
        let key = key.into();
        match self.0.get_mut(&key) {
            Some(existing) => existing.push(value),
            None => {
                let value = value.map(QueryValue::Value).unwrap_or(QueryValue::Flag);
                self.0.insert(key, value);
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.0.get(key)
    }

    /// First concrete value stored under `key`.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(QueryValue::first)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &QueryValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overlay `other` on top of this query; keys from `other` win.
    pub fn merged_with(&self, other: &Query) -> Query {
        let mut merged = self.clone();
        for (key, value) in other.iter() {
            merged.0.insert(key.clone(), value.clone());
        }
        merged
    }
}

impl<K, V> FromIterator<(K, V)> for Query
where
    K: Into<String>,
    V: Into<QueryValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut query = Query::new();
        for (k, v) in iter {
            query.insert(k, v);
        }
        query
    }
}

fn decode(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| {
            tracing::warn!(value = %raw, "Malformed percent-encoding in query, keeping raw value");
            raw.to_string()
        })
}

/// Component encoding that leaves `,` readable.
fn encode(raw: &str) -> String {
    urlencoding::encode(raw).replace("%2C", ",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_multi_valued() {
        let query = Query::parse("?a=1&b=2&a=3&flag");
        assert_eq!(query.len(), 3);
        assert_eq!(
            query.get("a"),
            Some(&QueryValue::List(vec![Some("1".into()), Some("3".into())]))
        );
        assert_eq!(query.first("b"), Some("2"));
        assert_eq!(query.get("flag"), Some(&QueryValue::Flag));
    }

    #[test]
    fn test_parse_decodes_plus_and_percent() {
        let query = Query::parse("q=hello+world&name=J%C3%BCrgen");
        assert_eq!(query.first("q"), Some("hello world"));
        assert_eq!(query.first("name"), Some("Jürgen"));
    }

    #[test]
    fn test_parse_empty() {
        assert!(Query::parse("").is_empty());
        assert!(Query::parse("?").is_empty());
    }

    #[test]
    fn test_stringify() {
        let mut query = Query::new();
        query.insert("tab", "info");
        query.append("tag", Some("a b".into()));
        query.append("tag", Some("c,d".into()));
        query.append("debug", None);
        assert_eq!(query.stringify(), "?tab=info&tag=a%20b&tag=c,d&debug");
        assert_eq!(Query::new().stringify(), "");
    }

    #[test]
    fn test_equality_ignores_order() {
        let a: Query = [("x", "1"), ("y", "2")].into_iter().collect();
        let b: Query = [("y", "2"), ("x", "1")].into_iter().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_merged_with_overrides() {
        let base = Query::parse("a=1&b=2");
        let extra: Query = [("b", "9")].into_iter().collect();
        let merged = base.merged_with(&extra);
        assert_eq!(merged.first("a"), Some("1"));
        assert_eq!(merged.first("b"), Some("9"));
    }
}
