//! Route table and path template errors.

use thiserror::Error;

/// Malformed route configuration. Fatal for the build call that hit it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RouteConfigError {
    /// A route node has no `path`.
    #[error("route config is missing \"path\" (name: {name:?})")]
    MissingPath { name: Option<String> },

    /// The same parameter name appears twice in one template.
    #[error("duplicate param key \"{param}\" in path \"{path}\"")]
    DuplicateParam { path: String, param: String },

    /// The template could not be compiled.
    #[error("invalid path pattern \"{path}\": {reason}")]
    InvalidPattern { path: String, reason: String },
}

/// A template could not be filled with the supplied params.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParamFillError {
    #[error("missing param \"{param}\" for path \"{template}\"")]
    Missing { template: String, param: String },

    #[error("param \"{param}\" = \"{value}\" is invalid for path \"{template}\": {reason}")]
    Mismatch {
        template: String,
        param: String,
        value: String,
        reason: String,
    },
}
