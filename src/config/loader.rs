//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::RouterConfig;
use crate::config::validation::{validate_config, ValidationError};
use crate::routing::error::RouteConfigError;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),

    #[error("Invalid route table: {0}")]
    Routes(#[from] RouteConfigError),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<RouterConfig, ConfigLoadError> {
    let config: RouterConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigLoadError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<RouterConfig, ConfigLoadError> {
    let content = fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    tracing::debug!(path = ?path, routes = config.routes.len(), "Configuration loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [engine]
            poll_interval_ms = 5

            [[routes]]
            path = "/about"
            name = "about"
            "#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.engine.poll_interval_ms, 5);
        assert_eq!(config.routes[0].name.as_deref(), Some("about"));
    }

    #[test]
    fn test_errors_are_classified() {
        assert!(matches!(
            load_config(Path::new("/definitely/not/here.toml")),
            Err(ConfigLoadError::Io(_))
        ));
        assert!(matches!(parse_config("routes = 3"), Err(ConfigLoadError::Parse(_))));

        let err = parse_config("[matching]\nmax_redirect_hops = 0").unwrap_err();
        assert!(matches!(err, ConfigLoadError::Validation(ref v) if v.len() == 1));
        assert!(err.to_string().contains("matching.max_redirect_hops"));
    }
}
