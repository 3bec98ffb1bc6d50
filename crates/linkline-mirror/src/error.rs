use std::path::PathBuf;

use linkline_core::{Retryable, StreamError};

#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    #[error("invalid bucket url {url}: {reason}")]
    BadUrl { url: String, reason: String },

    #[error("bucket credentials: {0}")]
    Credentials(String),

    #[error("malformed bucket listing: {0}")]
    Listing(String),

    #[error("object {0} not found")]
    NotFound(String),

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error("could not start download workers: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MirrorError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl Retryable for MirrorError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Stream(e) => e.is_retryable(),
            Self::Io { source, .. } => source.kind() != std::io::ErrorKind::StorageFull,
            Self::BadUrl { .. }
            | Self::Credentials(_)
            | Self::Listing(_)
            | Self::NotFound(_)
            | Self::Pool(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_classification() {
        let throttled = MirrorError::Stream(StreamError::Http {
            status: Some(503),
            message: "slow down".to_string(),
        });
        assert!(throttled.is_retryable());
        assert!(!MirrorError::NotFound("k".to_string()).is_retryable());
        let full = MirrorError::io("/x", std::io::Error::new(std::io::ErrorKind::StorageFull, "full"));
        assert!(!full.is_retryable());
    }
}
