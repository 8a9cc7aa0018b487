//! Errors raised while building requests and loading configuration.

use thiserror::Error;

/// A request or option set was rejected.
#[derive(Error, Debug)]
pub enum RankscopeError {
    /// Config file problem
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Input failed a constraint (bad URL, empty keyword, no devices)
    #[error("invalid input: {0}")]
    Validation(String),
}

/// Why a configuration could not be loaded or written.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The platform exposes no user config directory
    #[error("no user config directory on this platform")]
    NoConfigDir,

    /// An explicitly named file does not exist
    #[error("no config file at {path}")]
    NotFound {
        /// Requested path
        path: String,
    },

    /// Not valid TOML for the config schema
    #[error("config is not valid TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Config could not be rendered as TOML
    #[error("config could not be written as TOML: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// Reading or writing the file failed
    #[error("config file I/O: {0}")]
    Io(#[from] std::io::Error),

    /// A value parsed but is out of range
    #[error("{field}: {reason}")]
    InvalidValue {
        /// Dotted key, e.g. `governor.max_delay_ms`
        field: String,
        /// What is wrong with it
        reason: String,
    },
}

/// Result alias for request construction.
pub type Result<T> = std::result::Result<T, RankscopeError>;

/// Result alias for config loading and saving.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_problem() {
        let err = RankscopeError::Validation("keyword must not be empty".to_string());
        assert_eq!(err.to_string(), "invalid input: keyword must not be empty");

        let err = ConfigError::InvalidValue {
            field: "analysis.max_retries".to_string(),
            reason: "must be at least 1".to_string(),
        };
        assert_eq!(err.to_string(), "analysis.max_retries: must be at least 1");
    }

    #[test]
    fn test_config_error_is_transparent() {
        let err: RankscopeError = ConfigError::NoConfigDir.into();
        assert!(matches!(err, RankscopeError::Config(_)));
        assert_eq!(err.to_string(), "no user config directory on this platform");
    }
}
