//! Configuration loading from disk.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parse, normalize and validate configuration text.
pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    let mut config: AppConfig = toml::from_str(content).map_err(ConfigError::Parse)?;

    // Unset and zero both mean a single worker
    if config.monitor.workers == 0 {
        config.monitor.workers = 1;
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content)
}

/// Like [`load_config`], but a missing file yields the defaults.
///
/// Returns whether the file was found alongside the config.
pub fn load_config_or_default(path: &Path) -> Result<(AppConfig, bool), ConfigError> {
    match fs::read_to_string(path) {
        Ok(content) => parse_config(&content).map(|c| (c, true)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok((AppConfig::default(), false)),
        Err(e) => Err(ConfigError::Io(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_workers_normalized() {
        let config = parse_config("[monitor]\nworkers = 0\n").unwrap();
        assert_eq!(config.monitor.workers, 1);
    }

    #[test]
    fn test_negative_workers_rejected() {
        let err = parse_config("[monitor]\nworkers = -3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validation_error_surfaces() {
        let err = parse_config("[monitor]\nevent_buffer = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref v) if v.len() == 1));
        assert!(err.to_string().contains("event_buffer"));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let path = Path::new("definitely-missing-http-monitor-config.toml");
        let (config, found) = load_config_or_default(path).unwrap();
        assert!(!found);
        assert_eq!(config.monitor.workers, 1);
    }
}
