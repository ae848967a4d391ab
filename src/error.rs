use thiserror::Error;

/// Errors raised while loading or validating a [`crate::config::SimConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse the JSON content.
    #[error("failed to parse config JSON: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    /// A value that cannot be used by the simulation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}
