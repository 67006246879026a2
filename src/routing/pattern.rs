//! Path template compilation.
//!
//! # Syntax
//! - `/users/:id`: named segment parameter (`[^/]+?`)
//! - `/users/:id(\d+)`: named parameter with a custom pattern
//! - `/:lang?/docs`: optional parameter (`?`), repeatable (`+`, `*`)
//! - `/files/(.*)`: unnamed group, captured under [`FALLBACK_PARAM`]
//! - `*`: catch-all, captured under [`FALLBACK_PARAM`]
//! - `\\:`: escaped literal
//!
//! # Design Decisions
//! - Templates compile to one anchored regex, tested linearly by the matcher
//! - Non-strict templates accept one optional trailing slash
//! - Filling a template validates each value against its slot pattern

use regex::Regex;
use std::borrow::Cow;

use crate::location::Params;
use crate::routing::error::{ParamFillError, RouteConfigError};

/// Key used for unnamed captures (`*`, `(.*)`).
pub const FALLBACK_PARAM: &str = "pathMatch";

const DEFAULT_SEGMENT_PATTERN: &str = "[^/]+?";

/// Name of a parameter slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamName {
    Named(String),
    /// Positional slot for unnamed groups, numbered from 0.
    Index(usize),
}

/// One parameter slot of a template, in capture order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSlot {
    pub name: ParamName,
    /// `/` or `.` directly before the slot, empty otherwise.
    pub prefix: String,
    pub optional: bool,
    pub repeat: bool,
    /// Prefix is followed by more literal text in the same segment.
    pub partial: bool,
    pub asterisk: bool,
    pub pattern: String,
}

impl ParamSlot {
    /// Key the captured value is stored under.
    pub fn key(&self) -> Cow<'_, str> {
        match &self.name {
            ParamName::Named(name) => Cow::Borrowed(name),
            ParamName::Index(_) => Cow::Borrowed(FALLBACK_PARAM),
        }
    }

    fn fill_key(&self) -> Cow<'_, str> {
        match &self.name {
            ParamName::Named(name) => Cow::Borrowed(name),
            ParamName::Index(0) => Cow::Borrowed(FALLBACK_PARAM),
            ParamName::Index(i) => Cow::Owned(i.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Literal(String),
    Param(ParamSlot),
}

/// Compilation switches, mirroring the per-route `path_to_regexp_options`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatternOptions {
    pub sensitive: bool,
    pub strict: bool,
}

/// A compiled path template.
#[derive(Debug, Clone)]
pub struct PathPattern {
    template: String,
    tokens: Vec<Token>,
    regex: Regex,
}

impl PathPattern {
    /// Compile `template`, rejecting duplicate parameter names.
    pub fn compile(template: &str, options: PatternOptions) -> Result<Self, RouteConfigError> {
        let tokens = tokenize(template)?;

        let mut seen: Vec<&str> = Vec::new();
        for slot in tokens.iter().filter_map(as_slot) {
            if let ParamName::Named(name) = &slot.name {
                if seen.contains(&name.as_str()) {
                    return Err(RouteConfigError::DuplicateParam {
                        path: template.to_string(),
                        param: name.clone(),
                    });
                }
                seen.push(name);
            }
        }

        let source = to_regex_source(&tokens, options);
        let regex = Regex::new(&source).map_err(|e| RouteConfigError::InvalidPattern {
            path: template.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            template: template.to_string(),
            tokens,
            regex,
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn slots(&self) -> impl Iterator<Item = &ParamSlot> {
        self.tokens.iter().filter_map(as_slot)
    }

    /// Names of the non-optional named slots.
    pub fn required_params(&self) -> Vec<&str> {
        self.slots()
            .filter(|s| !s.optional)
            .filter_map(|s| match &s.name {
                ParamName::Named(n) => Some(n.as_str()),
                ParamName::Index(_) => None,
            })
            .collect()
    }

    /// Template contains a catch-all (`*`) slot.
    pub fn is_wildcard(&self) -> bool {
        self.slots().any(|s| s.asterisk)
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Test `path` and extract percent-decoded params on success.
    pub fn captures(&self, path: &str) -> Option<Params> {
        let caps = self.regex.captures(path)?;
        let mut params = Params::new();
        for (group, slot) in caps.iter().skip(1).zip(self.slots()) {
            if let Some(m) = group {
                params.insert(slot.key().into_owned(), decode_param(m.as_str()));
            }
        }
        Some(params)
    }

    /// Build a concrete path from `params`.
    pub fn fill(&self, params: &Params) -> Result<String, ParamFillError> {
        let mut path = String::new();
        for token in &self.tokens {
            let slot = match token {
                Token::Literal(text) => {
                    path.push_str(text);
                    continue;
                }
                Token::Param(slot) => slot,
            };

            let key = slot.fill_key();
            let value = match params.get(key.as_ref()) {
                Some(v) => v,
                None if slot.optional => {
                    if slot.partial {
                        path.push_str(&slot.prefix);
                    }
                    continue;
                }
                None => {
                    return Err(ParamFillError::Missing {
                        template: self.template.clone(),
                        param: key.into_owned(),
                    })
                }
            };

            let segments: Vec<&str> = if slot.repeat {
                let delimiter = if slot.prefix.is_empty() { "/" } else { slot.prefix.as_str() };
                value.split(delimiter).collect()
            } else {
                vec![value.as_str()]
            };

            let check = Regex::new(&format!("^(?:{})$", slot.pattern)).map_err(|e| {
                ParamFillError::Mismatch {
                    template: self.template.clone(),
                    param: key.to_string(),
                    value: value.clone(),
                    reason: e.to_string(),
                }
            })?;

            for (i, segment) in segments.iter().enumerate() {
                let encoded = encode_param(segment);
                if !check.is_match(&encoded) {
                    return Err(ParamFillError::Mismatch {
                        template: self.template.clone(),
                        param: key.to_string(),
                        value: encoded,
                        reason: format!("expected to match \"{}\"", slot.pattern),
                    });
                }
                if i == 0 || !slot.prefix.is_empty() {
                    path.push_str(&slot.prefix);
                } else {
                    path.push('/');
                }
                path.push_str(&encoded);
            }
        }
        Ok(path)
    }
}

fn as_slot(token: &Token) -> Option<&ParamSlot> {
    match token {
        Token::Param(slot) => Some(slot),
        Token::Literal(_) => None,
    }
}

fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Does a parameter start at `i`?
fn starts_param(chars: &[char], i: usize) -> bool {
    match chars.get(i) {
        Some(':') => chars.get(i + 1).copied().is_some_and(is_word),
        Some('(') | Some('*') => true,
        _ => false,
    }
}

/// Read a `( ... )` group starting at `open`; returns the inner pattern and the
/// index after `)`.
fn read_group(chars: &[char], open: usize, template: &str) -> Result<(String, usize), RouteConfigError> {
    let mut pattern = String::new();
    let mut i = open + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' if i + 1 < chars.len() => {
                pattern.push('\\');
                pattern.push(chars[i + 1]);
                i += 2;
            }
            ')' if !pattern.is_empty() => return Ok((pattern, i + 1)),
            '(' | ')' => break,
            c => {
                pattern.push(c);
                i += 1;
            }
        }
    }
    Err(RouteConfigError::InvalidPattern {
        path: template.to_string(),
        reason: format!("unterminated or empty group at offset {open}"),
    })
}

fn tokenize(template: &str) -> Result<Vec<Token>, RouteConfigError> {
    let chars: Vec<char> = template.chars().collect();
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut next_index = 0;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '\\' && i + 1 < chars.len() {
            literal.push(chars[i + 1]);
            i += 2;
            continue;
        }

        let (prefix, start) = if (c == '/' || c == '.') && starts_param(&chars, i + 1) {
            (Some(c), i + 1)
        } else if starts_param(&chars, i) {
            (None, i)
        } else {
            literal.push(c);
            i += 1;
            continue;
        };

        let mut asterisk = false;
        let mut cursor = start;
        let (name, pattern) = match chars[start] {
            ':' => {
                cursor += 1;
                let mut name = String::new();
                while cursor < chars.len() && is_word(chars[cursor]) {
                    name.push(chars[cursor]);
                    cursor += 1;
                }
                let pattern = if chars.get(cursor) == Some(&'(') {
                    let (pattern, after) = read_group(&chars, cursor, template)?;
                    cursor = after;
                    Some(pattern)
                } else {
                    None
                };
                (ParamName::Named(name), pattern)
            }
            '(' => {
                let (pattern, after) = read_group(&chars, cursor, template)?;
                cursor = after;
                let name = ParamName::Index(next_index);
                next_index += 1;
                (name, Some(pattern))
            }
            _ => {
                cursor += 1;
                asterisk = true;
                let name = ParamName::Index(next_index);
                next_index += 1;
                (name, Some(".*".to_string()))
            }
        };

        let modifier = if asterisk {
            None
        } else {
            match chars.get(cursor) {
                Some(m @ ('?' | '*' | '+')) => {
                    cursor += 1;
                    Some(*m)
                }
                _ => None,
            }
        };

        if !literal.is_empty() {
            tokens.push(Token::Literal(std::mem::take(&mut literal)));
        }

        let next = chars.get(cursor).copied();
        tokens.push(Token::Param(ParamSlot {
            name,
            prefix: prefix.map(String::from).unwrap_or_default(),
            optional: matches!(modifier, Some('?') | Some('*')),
            repeat: matches!(modifier, Some('+') | Some('*')),
            partial: prefix.is_some() && next.is_some() && next != prefix,
            asterisk,
            pattern: pattern.unwrap_or_else(|| DEFAULT_SEGMENT_PATTERN.to_string()),
        }));
        i = cursor;
    }

    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }
    Ok(tokens)
}

fn to_regex_source(tokens: &[Token], options: PatternOptions) -> String {
    let mut route = String::new();
    for token in tokens {
        match token {
            Token::Literal(text) => route.push_str(&regex::escape(text)),
            Token::Param(slot) => {
                let prefix = regex::escape(&slot.prefix);
                let mut capture = format!("(?:{})", slot.pattern);
                if slot.repeat {
                    capture = format!("{capture}(?:{prefix}{capture})*");
                }
                let group = if slot.optional {
                    if slot.partial {
                        format!("{prefix}({capture})?")
                    } else {
                        format!("(?:{prefix}({capture}))?")
                    }
                } else {
                    format!("{prefix}({capture})")
                };
                route.push_str(&group);
            }
        }
    }

    if !options.strict {
        if route.ends_with('/') {
            route.pop();
        }
        route.push_str("(?:/)?");
    }
    route.push('$');

    let flags = if options.sensitive { "" } else { "(?i)" };
    format!("{flags}^{route}")
}

fn decode_param(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| raw.to_string())
}

/// Percent-encode a param value for a path, keeping `/` and the other
/// characters that are legal inside a URI path.
fn encode_param(value: &str) -> String {
    const KEEP: &str = ";,/:@&=+$!*'()";
    let mut encoded = String::with_capacity(value.len());
    let mut buf = [0u8; 4];
    for c in value.chars() {
        if c.is_ascii_alphanumeric() || "-_.~".contains(c) || KEEP.contains(c) {
            encoded.push(c);
        } else {
            encoded.push_str(&urlencoding::encode(c.encode_utf8(&mut buf)));
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(template: &str) -> PathPattern {
        PathPattern::compile(template, PatternOptions::default()).unwrap()
    }

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_named_param_match() {
        let p = compile("/user/:id");
        assert_eq!(p.captures("/user/42"), Some(params(&[("id", "42")])));
        assert_eq!(p.captures("/user/42/"), Some(params(&[("id", "42")])));
        assert!(p.captures("/user").is_none());
        assert!(p.captures("/user/42/extra").is_none());
    }

    #[test]
    fn test_case_and_strict_options() {
        let loose = compile("/About");
        assert!(loose.is_match("/about"));

        let sensitive = PathPattern::compile(
            "/About",
            PatternOptions { sensitive: true, strict: false },
        )
        .unwrap();
        assert!(!sensitive.is_match("/about"));

        let strict = PathPattern::compile(
            "/about",
            PatternOptions { sensitive: false, strict: true },
        )
        .unwrap();
        assert!(strict.is_match("/about"));
        assert!(!strict.is_match("/about/"));
    }

    #[test]
    fn test_wildcard_fallback_capture() {
        let p = compile("/user/:id/*");
        assert!(p.is_wildcard());
        let caps = p.captures("/user/42/extra/path").unwrap();
        assert_eq!(caps.get("id").map(String::as_str), Some("42"));
        assert_eq!(caps.get(FALLBACK_PARAM).map(String::as_str), Some("extra/path"));

        let all = compile("*");
        assert_eq!(
            all.captures("/anything/at/all").unwrap().get(FALLBACK_PARAM).map(String::as_str),
            Some("/anything/at/all")
        );
    }

    #[test]
    fn test_optional_and_custom_pattern() {
        let p = compile("/docs/:lang?/:page(\\d+)");
        assert_eq!(p.required_params(), vec!["page"]);
        assert_eq!(
            p.captures("/docs/en/3"),
            Some(params(&[("lang", "en"), ("page", "3")]))
        );
        assert_eq!(p.captures("/docs/3"), Some(params(&[("page", "3")])));
        assert!(p.captures("/docs/en/intro").is_none());
    }

    #[test]
    fn test_captures_are_percent_decoded() {
        let p = compile("/tag/:name");
        assert_eq!(
            p.captures("/tag/caf%C3%A9%20bar"),
            Some(params(&[("name", "café bar")]))
        );
    }

    #[test]
    fn test_duplicate_param_rejected() {
        let err = PathPattern::compile("/a/:id/b/:id", PatternOptions::default()).unwrap_err();
        assert!(matches!(err, RouteConfigError::DuplicateParam { ref param, .. } if param == "id"));
    }

    #[test]
    fn test_unterminated_group_rejected() {
        let err = PathPattern::compile("/a/(\\d+", PatternOptions::default()).unwrap_err();
        assert!(matches!(err, RouteConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn test_fill() {
        let p = compile("/user/:id/post/:slug?");
        assert_eq!(p.fill(&params(&[("id", "7")])).unwrap(), "/user/7/post");
        assert_eq!(
            p.fill(&params(&[("id", "7"), ("slug", "hello world")])).unwrap(),
            "/user/7/post/hello%20world"
        );
    }

    #[test]
    fn test_fill_errors() {
        let p = compile("/user/:id");
        assert!(matches!(
            p.fill(&Params::new()),
            Err(ParamFillError::Missing { ref param, .. }) if param == "id"
        ));
        assert!(matches!(
            p.fill(&params(&[("id", "a/b")])),
            Err(ParamFillError::Mismatch { .. })
        ));
    }

    #[test]
    fn test_fill_wildcard_allows_slashes() {
        let p = compile("/files/*");
        assert_eq!(
            p.fill(&params(&[(FALLBACK_PARAM, "a/b.txt")])).unwrap(),
            "/files/a/b.txt"
        );
    }

    #[test]
    fn test_escaped_colon_is_literal() {
        let p = compile("/time/10\\:30");
        assert!(p.is_match("/time/10:30"));
        assert_eq!(p.slots().count(), 0);
    }
}
