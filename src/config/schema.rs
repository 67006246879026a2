//! Configuration schema definitions.
//!
//! The declarative part of a router setup: engine tuning, matching defaults
//! and the route tree. Everything derives `Deserialize` so a whole router can
//! be described in one TOML file; guards, dynamic redirects and dynamic props
//! can only be attached programmatically.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::location::RawLocation;
use crate::navigation::component::ComponentSlot;
use crate::navigation::guard::NavigationGuard;
use crate::navigation::view::PropsSpec;
use crate::routing::pattern::PatternOptions;
use crate::routing::record::{Redirect, RedirectFn};

/// Root configuration for a router.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RouterConfig {
    /// Transition engine settings.
    pub engine: EngineConfig,

    /// Matching defaults applied to every route.
    pub matching: MatchingConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Route tree.
    pub routes: Vec<RouteConfig>,
}

/// Transition engine settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Interval between checks for a mounted instance when an enter guard
    /// deferred a callback, in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 16,
        }
    }
}

/// Matching defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Case-sensitive matching unless a route says otherwise.
    pub sensitive: bool,

    /// Trailing slashes are significant unless a route says otherwise.
    pub strict: bool,

    /// Redirects followed before a chain is treated as malformed.
    pub max_redirect_hops: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            sensitive: false,
            strict: false,
            max_redirect_hops: 16,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error), used when `RUST_LOG` is unset.
    pub log_level: String,

    /// Emit JSON log lines instead of human-readable output.
    pub json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}

/// Per-route overrides for path compilation.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PathOptions {
    pub sensitive: Option<bool>,
    pub strict: Option<bool>,
}

/// One node of the route tree.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RouteConfig {
    /// Path template, relative to the parent unless it starts with `/`.
    pub path: Option<String>,

    /// Unique route name for named navigation.
    pub name: Option<String>,

    /// Component for the `default` view slot.
    pub component: Option<ComponentSlot>,

    /// Components by view slot; takes precedence over `component`.
    pub components: IndexMap<String, ComponentSlot>,

    pub redirect: Option<Redirect>,

    /// Additional paths that render this route.
    #[serde(deserialize_with = "one_or_many")]
    pub alias: Vec<String>,

    pub children: Vec<RouteConfig>,

    pub meta: Map<String, Value>,

    /// Props for the `default` slot.
    pub props: Option<PropsSpec>,

    /// Props for named slots.
    pub slot_props: IndexMap<String, PropsSpec>,

    pub case_sensitive: Option<bool>,

    pub path_to_regexp_options: PathOptions,

    #[serde(skip)]
    pub before_enter: Option<NavigationGuard>,
}

impl RouteConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn component(mut self, component: impl Into<ComponentSlot>) -> Self {
        self.component = Some(component.into());
        self
    }

    /// Component for a named view slot. The first call also moves `component`
    /// into the `default` slot.
    pub fn named_component(mut self, slot: impl Into<String>, component: impl Into<ComponentSlot>) -> Self {
        if self.components.is_empty() {
            if let Some(default) = self.component.take() {
                self.components.insert("default".to_string(), default);
            }
        }
        self.components.insert(slot.into(), component.into());
        self
    }

    pub fn child(mut self, child: RouteConfig) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: Vec<RouteConfig>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn redirect(mut self, to: impl Into<RawLocation>) -> Self {
        self.redirect = Some(Redirect::Static(to.into()));
        self
    }

    pub fn redirect_with(mut self, f: RedirectFn) -> Self {
        self.redirect = Some(Redirect::Dynamic(f));
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias.push(alias.into());
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn props(mut self, props: PropsSpec) -> Self {
        self.props = Some(props);
        self
    }

    pub fn slot_props(mut self, slot: impl Into<String>, props: PropsSpec) -> Self {
        self.slot_props.insert(slot.into(), props);
        self
    }

    pub fn before_enter(mut self, guard: NavigationGuard) -> Self {
        self.before_enter = Some(guard);
        self
    }

    pub fn case_sensitive(mut self, sensitive: bool) -> Self {
        self.case_sensitive = Some(sensitive);
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.path_to_regexp_options.strict = Some(strict);
        self
    }

    /// Empty-path child, rendered when its parent's path matches exactly.
    pub fn is_default_child(&self) -> bool {
        matches!(self.path.as_deref(), Some("") | Some("/"))
    }

    /// Compilation options: route overrides, then global defaults.
    pub fn pattern_options(&self, defaults: &MatchingConfig) -> PatternOptions {
        PatternOptions {
            sensitive: self
                .path_to_regexp_options
                .sensitive
                .or(self.case_sensitive)
                .unwrap_or(defaults.sensitive),
            strict: self.path_to_regexp_options.strict.unwrap_or(defaults.strict),
        }
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(alias) => vec![alias],
        OneOrMany::Many(aliases) => aliases,
    })
}
