//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::{ServiceConfig, UpstreamConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading and startup wiring.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),

    #[error("failed to read bearer token from {}: {source}", .path.display())]
    Token {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("bearer token file {} is empty", .0.display())]
    EmptyToken(PathBuf),

    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ServiceConfig, ConfigError> {
    let config: ServiceConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Resolve the bearer token, reading the token file if one is configured.
///
/// File contents are trimmed; mounted service account tokens often end in a newline.
pub fn resolve_bearer_token(upstream: &UpstreamConfig) -> Result<String, ConfigError> {
    if let Some(token) = &upstream.bearer_token {
        return Ok(token.clone());
    }

    let Some(path) = &upstream.bearer_token_file else {
        return Err(ConfigError::Validation(vec![ValidationError::TokenSource]));
    };

    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Token {
        path: path.clone(),
        source,
    })?;
    let token = raw.trim();
    if token.is_empty() {
        return Err(ConfigError::EmptyToken(path.clone()));
    }
    Ok(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogFormat;
    use std::io::Write;

    const SAMPLE: &str = r#"
[listener]
bind_address = "127.0.0.1:9443"

[upstream]
bearer_token = "abc"

[timeouts]
upstream_secs = 10

[observability]
log_format = "json"

[[listers]]
name = "event-sources"
route = "/api/event-sources"
url = "https://kubernetes.default.svc/apis/sources.knative.dev/v1/pingsources"

[[listers]]
name = "channels"
route = "/api/channels"
url = "https://kubernetes.default.svc/apis/messaging.knative.dev/v1/channels"
"#;

    #[test]
    fn test_parse_full_config() {
        let config = parse_config(SAMPLE).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:9443");
        assert_eq!(config.upstream.bearer_token.as_deref(), Some("abc"));
        assert_eq!(config.timeouts.upstream_secs, 10);
        // unspecified fields keep their defaults
        assert_eq!(config.timeouts.connect_secs, 5);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.listers.len(), 2);
        assert_eq!(config.listers[1].name, "channels");
    }

    #[test]
    fn test_unknown_log_format_is_parse_error() {
        let content = SAMPLE.replace("\"json\"", "\"xml\"");
        assert!(matches!(parse_config(&content), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_validation_errors_are_joined() {
        let err = parse_config("").unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Validation failed: "), "{message}");
        assert!(message.contains("bearer_token"), "{message}");
        assert!(message.contains("[[listers]]"), "{message}");
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.listers[0].route, "/api/event-sources");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_config(Path::new("/nonexistent/lister.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_token_file_is_trimmed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  eyJhbGciOi.token  ").unwrap();

        let upstream = UpstreamConfig {
            bearer_token_file: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        assert_eq!(resolve_bearer_token(&upstream).unwrap(), "eyJhbGciOi.token");
    }

    #[test]
    fn test_empty_or_missing_token_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let upstream = UpstreamConfig {
            bearer_token_file: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        assert!(matches!(
            resolve_bearer_token(&upstream),
            Err(ConfigError::EmptyToken(_))
        ));

        let upstream = UpstreamConfig {
            bearer_token_file: Some("/nonexistent/token".into()),
            ..Default::default()
        };
        let err = resolve_bearer_token(&upstream).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/token"));
    }

    #[test]
    fn test_inline_token_wins() {
        let upstream = UpstreamConfig {
            bearer_token: Some("inline".into()),
            ..Default::default()
        };
        assert_eq!(resolve_bearer_token(&upstream).unwrap(), "inline");
    }
}
