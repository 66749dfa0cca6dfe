use std::path::PathBuf;

use thiserror::Error;

/// Rejection of a record at the ingestion boundary.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("malformed trace record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("trace record has no numeric traceType")]
    MissingKind,

    #[error("unknown traceType {0}")]
    UnknownKind(u64),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode call stack in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("entry {index} ends before it starts")]
    Inverted { index: usize },
}
