//! Error types for command invocation and configuration files.

use command_model_core::{BindingError, ConfigurationError, ValidationError};
use thiserror::Error;

/// Errors a command invocation can fail with.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Arguments were rejected by the command's schema.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Call-site values did not fit the command's signature.
    #[error(transparent)]
    Binding(#[from] BindingError),

    /// The command was declared incorrectly.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// A keyword argument could not be read as the requested type.
    #[error("invalid value for argument '{name}': {source}")]
    Argument {
        /// Parameter name.
        name: String,
        /// Deserialization failure.
        #[source]
        source: serde_json::Error,
    },

    /// A keyword argument was read but never supplied.
    #[error("missing argument '{0}'")]
    MissingArgument(String),

    /// Writing command output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The command line could not be parsed.
    #[error("{0}")]
    Usage(clap::Error),

    /// Stop and exit with the given status.
    #[error("exit with status {0}")]
    Exit(i32),

    /// The command body failed.
    #[error(transparent)]
    Failed(Box<dyn std::error::Error + Send + Sync>),
}

impl CommandError {
    /// Wraps an arbitrary command failure.
    pub fn failed(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Failed(err.into())
    }

    /// A command failure carrying only a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Failed(message.into().into())
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Exit(code) => *code,
            Self::Usage(err) => err.exit_code(),
            _ => 1,
        }
    }
}

/// Convenience alias for results with [`CommandError`].
pub type Result<T> = std::result::Result<T, CommandError>;

/// Errors reading or writing a [`CliConfig`](crate::CliConfig) file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
