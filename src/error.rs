use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading and validating the configuration.
///
/// All of these are fatal at startup: no partial bar is ever shown.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("configuration has no blocks section")]
    MissingBlocks,

    #[error("block #{index} does not name a plugin")]
    MissingPlugin { index: usize },

    #[error("block {block}: interval must be at least 1 second (got {interval})")]
    InvalidInterval { block: String, interval: u64 },

    #[error("{plugin}: missing required option '{option}'")]
    MissingOption { plugin: String, option: String },

    #[error("{plugin}: invalid value for option '{option}': {reason}")]
    InvalidOption {
        plugin: String,
        option: String,
        reason: String,
    },

    #[error("{plugin}_{instance}: {reason}")]
    Plugin {
        plugin: String,
        instance: String,
        reason: String,
    },
}

impl ConfigError {
    /// Process exit code for this class of error.
    pub fn exit_code(&self) -> u8 {
        match self {
            ConfigError::MissingBlocks
            | ConfigError::MissingPlugin { .. }
            | ConfigError::InvalidInterval { .. } => 2,
            ConfigError::Io { .. } => 3,
            ConfigError::Parse { .. } => 4,
            ConfigError::MissingOption { .. } | ConfigError::InvalidOption { .. } => 5,
            ConfigError::Plugin { .. } => 6,
        }
    }

    pub fn plugin(plugin: &str, instance: &str, reason: impl Into<String>) -> Self {
        ConfigError::Plugin {
            plugin: plugin.to_string(),
            instance: instance.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while building a worker.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkerError {
    #[error("worker has no block to update")]
    MissingBlock,

    #[error("worker for plugin '{0}' has no instance name")]
    Unnamed(String),

    #[error("worker {0} has no sensor")]
    MissingSensor(String),

    #[error("worker {0} has a zero polling interval")]
    ZeroInterval(String),
}

/// Errors raised while loading an external plugin. These are logged and
/// the offending plugin is skipped.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("failed to inspect {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not executable", path.display())]
    NotExecutable { path: PathBuf },

    #[error("{} returned an invalid description: {reason}", path.display())]
    InvalidInfo { path: PathBuf, reason: String },

    #[error("plugin '{0}' is already registered")]
    Duplicate(String),
}
