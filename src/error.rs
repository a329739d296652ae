use std::path::PathBuf;
use thiserror::Error;

/// Failure to turn a file, directory or byte payload into a [`Network`].
///
/// [`Network`]: crate::network::Network
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("network source not found: {0}")]
    Missing(PathBuf),

    #[error("i/o error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed csv in {file}: {source}")]
    Csv {
        file: String,
        #[source]
        source: csv::Error,
    },

    #[error("malformed network json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported network format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid network: {0}")]
    Invalid(String),
}

/// Errors raised by the explorer core.
///
/// Only [`ExplorerError::Load`] is ever fatal, and only at startup. Everything
/// else is turned into a banner by the view assembler.
#[derive(Debug, Error)]
pub enum ExplorerError {
    #[error("failed to load network '{label}': {source}")]
    Load {
        label: String,
        #[source]
        source: LoadError,
    },

    #[error("network '{0}' is not registered")]
    NotFound(String),

    #[error("network label '{0}' is already registered")]
    DuplicateLabel(String),

    #[error("unsupported metric or tab '{0}'")]
    UnsupportedMetric(String),

    #[error("no networks are registered")]
    NoNetworks,

    #[error("session {0} does not exist")]
    SessionNotFound(uuid::Uuid),
}

impl ExplorerError {
    /// Short machine readable kind, used in banners and API bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            ExplorerError::Load { .. } => "LoadError",
            ExplorerError::NotFound(_) => "NotFoundError",
            ExplorerError::DuplicateLabel(_) => "DuplicateLabel",
            ExplorerError::UnsupportedMetric(_) => "UnsupportedMetricError",
            ExplorerError::NoNetworks => "NoNetworks",
            ExplorerError::SessionNotFound(_) => "SessionNotFound",
        }
    }
}

pub type Result<T, E = ExplorerError> = std::result::Result<T, E>;
