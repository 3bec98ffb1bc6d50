//! Error taxonomy of the relation engine

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by loading, projecting, validating and loading a batch.
///
/// Every variant is fatal to the operation that raised it; nothing is
/// retried or swallowed inside the engine.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Malformed or unreadable input JSON.
    #[error("failed to load {location}: {message}")]
    Load { location: String, message: String },

    /// Expected input files or directories are missing.
    #[error("not found: {0}")]
    NotFound(String),

    /// A required column is absent from every row of a non-empty projection.
    #[error("relation {relation}: required column '{column}' absent from batch")]
    Schema {
        relation: &'static str,
        column: String,
    },

    /// Year-count mismatch or duplicate document identifiers.
    #[error("input validation failed for {batch}: {reason}")]
    Validation { batch: String, reason: String },

    /// Missing operational parameters (agency/version, metadata, destination).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Failure reported by a persistence destination.
    #[error("destination error: {0}")]
    Destination(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl IngestError {
    pub(crate) fn load(location: impl std::fmt::Display, message: impl std::fmt::Display) -> Self {
        Self::Load {
            location: location.to_string(),
            message: message.to_string(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap an error raised by a [`Destination`](crate::Destination) implementation.
    pub fn destination(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Destination(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_names_relation_and_column() {
        let err = IngestError::Schema {
            relation: "dyads",
            column: "alias_id".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "relation dyads: required column 'alias_id' absent from batch"
        );
    }

    #[test]
    fn destination_error_keeps_source() {
        let io = std::io::Error::other("disk gone");
        let err = IngestError::destination(io);
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("disk gone"));
    }
}
