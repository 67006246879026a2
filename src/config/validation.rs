//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (poll interval > 0, hop limit > 0)
//! - Check every route node has a path and every redirect a target
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RouterConfig → Result<(), Vec<ValidationError>>
//! - Pattern compilation errors are left to the route table build

use thiserror::Error;

use crate::config::schema::{RouteConfig, RouterConfig};
use crate::routing::record::Redirect;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// One semantic problem, located by its dotted field path.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field}: must be greater than zero")]
    NotPositive { field: String },

    #[error("{field}: unknown log level \"{value}\"")]
    UnknownLogLevel { field: String, value: String },

    #[error("{field}: route has no path")]
    MissingPath { field: String },

    #[error("{field}: redirect needs a path or a name")]
    EmptyRedirect { field: String },

    #[error("{field}: alias must not be empty")]
    EmptyAlias { field: String },
}

pub fn validate_config(config: &RouterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.engine.poll_interval_ms == 0 {
        errors.push(ValidationError::NotPositive {
            field: "engine.poll_interval_ms".into(),
        });
    }
    if config.matching.max_redirect_hops == 0 {
        errors.push(ValidationError::NotPositive {
            field: "matching.max_redirect_hops".into(),
        });
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::UnknownLogLevel {
            field: "observability.log_level".into(),
            value: config.observability.log_level.clone(),
        });
    }

    for (i, route) in config.routes.iter().enumerate() {
        validate_route(route, &format!("routes[{i}]"), &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_route(route: &RouteConfig, field: &str, errors: &mut Vec<ValidationError>) {
    if route.path.is_none() {
        errors.push(ValidationError::MissingPath {
            field: format!("{field}.path"),
        });
    }

    if let Some(Redirect::Static(to)) = &route.redirect {
        let has_path = to.path.as_deref().is_some_and(|p| !p.is_empty());
        if !has_path && to.name.is_none() {
            errors.push(ValidationError::EmptyRedirect {
                field: format!("{field}.redirect"),
            });
        }
    }

    for (i, alias) in route.alias.iter().enumerate() {
        if alias.is_empty() {
            errors.push(ValidationError::EmptyAlias {
                field: format!("{field}.alias[{i}]"),
            });
        }
    }

    for (i, child) in route.children.iter().enumerate() {
        validate_route(child, &format!("{field}.children[{i}]"), errors);
    }
}
