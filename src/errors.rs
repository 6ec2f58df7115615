use thiserror::Error;

/// Main error type for the tailwind-config crate
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Pattern error: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Glob error: {0}")]
    Glob(#[from] glob::GlobError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("No files found matching the content patterns")]
    NoFilesFound,

    #[error("No Tailwind configuration file found in {0}")]
    ConfigNotFound(String),

    #[error("Failed to parse file {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("Failed to write output to {path}: {message}")]
    OutputError { path: String, message: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Unsupported config file format: {0}. Use .js, .cjs, .mjs, .ts, .json, .yaml or .yml")]
    UnsupportedFormat(String),

    #[error("Invalid content pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Plugin '{0}' could not be resolved")]
    PluginNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Security violation: {0}")]
    SecurityError(String),
}

impl ConfigError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        ConfigError::InvalidConfig {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
