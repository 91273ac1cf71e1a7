//! Error types shared by the content and comment modules

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading pages, storing comments or rendering templates
#[derive(Error, Debug)]
pub enum BlogError {
    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed comment file {path:?}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Cannot encode comments for {path:?}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid page title: {0:?}")]
    InvalidTitle(String),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),
}

impl BlogError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True when the underlying cause is a missing file or directory
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

pub type Result<T> = std::result::Result<T, BlogError>;
