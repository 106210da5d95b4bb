//! Error taxonomy.
//!
//! Stale or unknown fix codes are not errors: lookups return `None`.

use std::path::PathBuf;

/// Failure of one aggregation pass. Nothing from the pass is applied.
#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    /// Compiler filenames are relative to the project root, which is unknown.
    #[error("cannot resolve without root")]
    MissingRoot,
}

/// The external analysis tool failed or produced something unusable.
///
/// Independent of compiler diagnostics: a build with errors is a successful
/// tool invocation.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The configured command line is empty.
    #[error("no {0} command configured")]
    NoCommand(&'static str),

    /// The process could not be started.
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The process exited unsuccessfully without printing a result.
    #[error("`{command}` exited with {status}: {stderr}")]
    Exited {
        command: String,
        status: String,
        stderr: String,
    },

    /// The process printed something that is not the expected JSON.
    #[error("`{command}` produced malformed output: {source}")]
    Malformed {
        command: String,
        #[source]
        source: serde_json::Error,
    },

    /// The process did not finish within the configured timeout.
    #[error("`{command}` timed out after {secs}s")]
    TimedOut { command: String, secs: u64 },

    /// The tool rejected the request.
    #[error("analysis tool rejected the request: {0}")]
    Rejected(String),
}

/// Configuration could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid editor settings: {0}")]
    Settings(#[from] serde_json::Error),
}
