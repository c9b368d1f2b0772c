// src/error.rs

use std::path::PathBuf;
use thiserror::Error;
use url::Url;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything the pipeline can fail with.
///
/// The first four variants are the caller-visible taxonomy: bad selection,
/// retrieval failure, upstream layout change, and unparseable values.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    #[error("fetching {location} failed: {cause}")]
    Fetch {
        location: Url,
        #[source]
        cause: FetchCause,
    },

    #[error("malformed source {location}: {reason}")]
    MalformedSource { location: String, reason: String },

    #[error("cannot normalize {field} value {value:?}: {reason}")]
    Normalization {
        field: String,
        value: String,
        reason: String,
    },

    #[error("writing {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration: {0}")]
    Config(String),
}

/// Underlying reason a fetch failed.
#[derive(Debug, Error)]
pub enum FetchCause {
    #[error("HTTP status {0}")]
    Status(reqwest::StatusCode),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidSelection(msg.into())
    }

    pub(crate) fn malformed(location: impl ToString, reason: impl Into<String>) -> Self {
        Error::MalformedSource {
            location: location.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn normalization(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Error::Normalization {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn output(path: impl Into<PathBuf>, source: impl Into<std::io::Error>) -> Self {
        Error::Output {
            path: path.into(),
            source: source.into(),
        }
    }

    /// True when the remote answered 404 or the mirrored file does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Fetch {
                cause: FetchCause::Status(code),
                ..
            } => *code == reqwest::StatusCode::NOT_FOUND,
            Error::Fetch {
                cause: FetchCause::Io(e),
                ..
            } => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
