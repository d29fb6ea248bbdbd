//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::RelayConfig;
use crate::config::validation::ValidationError;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load a TOML configuration file without validating it.
///
/// Callers apply command line overrides before calling [`crate::config::validate_config`].
pub fn read_config(path: &Path) -> Result<RelayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse configuration from TOML text.
pub fn parse_config(content: &str) -> Result<RelayConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::validation::validate_config;
    use std::io::Write;

    #[test]
    fn empty_document_yields_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:9000");
        assert_eq!(config.upstream.base_url, "http://192.168.10.216/");
        assert!(config.file_proxy.enabled);
        assert!(!config.file_proxy.preserve_host);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = parse_config(
            r#"
            [upstream]
            base_url = "http://10.0.0.5:8080/"

            [timeouts]
            request_secs = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.upstream.base_url, "http://10.0.0.5:8080/");
        assert_eq!(config.timeouts.request_secs, 3);
        assert_eq!(config.timeouts.connect_secs, 5);
        assert_eq!(config.static_files.root, "html");
    }

    #[test]
    fn example_file_is_valid() {
        let config = parse_config(include_str!("../../relay.example.toml")).unwrap();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = parse_config("[listener\nbind_address = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn file_with_bad_values_reads_but_fails_validation() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[upstream]\nbase_url = \"ftp://device/\"").unwrap();
        writeln!(file, "[timeouts]\nconnect_secs = 0").unwrap();

        let config = read_config(file.path()).unwrap();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(ConfigError::Validation(errors)
            .to_string()
            .starts_with("Validation failed: "));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = read_config(Path::new("/nonexistent/relay.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
