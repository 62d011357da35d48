//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::SecurityConfig;
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

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<SecurityConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: SecurityConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config: SecurityConfig = toml::from_str("").unwrap();
        assert_eq!(config.risk.suspicious_threshold, 3);
        assert_eq!(config.risk.max_suspicious_attempts, 5);
        assert_eq!(config.keys.rotation_interval_secs, 86_400);
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let toml = r#"
            [risk]
            waf_block_secs = 120

            [[rate_limit.actions]]
            action = "login"
            limit = 5
            window_secs = 60
        "#;
        let config: SecurityConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.risk.waf_block_secs, 120);
        assert_eq!(config.risk.ddos_block_secs, 1800);
        assert_eq!(config.rate_limit.actions.len(), 1);
        assert_eq!(config.rate_limit.actions[0].limit, 5);
    }

    #[test]
    fn load_rejects_invalid_values() {
        let path = std::env::temp_dir().join("gatehouse_loader_test.toml");
        fs::write(&path, "[tracker]\nwindow_secs = 0\n").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        fs::remove_file(&path).unwrap_or_default();
    }
}
