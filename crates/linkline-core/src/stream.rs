//! Input streams: local (optionally gzipped) text files and the shared runtime.
//!
//! Remote calls are async on a shared tokio runtime but are driven through
//! sync calls (`SHARED_RUNTIME.handle().block_on`) so rayon workers can use them.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::LazyLock;

use flate2::read::MultiGzDecoder;

use crate::retry::Retryable;

/// Buffer size for file readers (256KB)
const READ_BUF_SIZE: usize = 256 * 1024;

/// Gzip member header magic bytes
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Error types for stream operations
#[derive(Debug)]
pub enum StreamError {
    /// HTTP error with optional status code
    Http {
        status: Option<u16>,
        message: String,
    },
    /// I/O error
    Io(std::io::Error),
}

impl std::fmt::Display for StreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http {
                status: Some(s),
                message,
            } => write!(f, "HTTP {s}: {message}"),
            Self::Http {
                status: None,
                message,
            } => write!(f, "HTTP error: {message}"),
            Self::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for StreamError {}

impl Retryable for StreamError {
    fn is_retryable(&self) -> bool {
        match self {
            // Client errors (missing object, denied access) will not heal on retry;
            // throttling (429) and server errors might.
            Self::Http {
                status: Some(s), ..
            } => *s == 429 || *s >= 500,
            Self::Http { status: None, .. } => true,
            // Disk full is not retryable, timeout IS retryable
            Self::Io(e) => e.kind() != io::ErrorKind::StorageFull,
        }
    }
}

impl From<std::io::Error> for StreamError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Shared tokio runtime for object-store operations.
pub static SHARED_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});

/// Open a text file for line reading, transparently gunzipping it.
///
/// Compression is detected from content, not extension. Concatenated gzip
/// members (as produced by parallel exporters) are read as one stream.
pub fn open_text_reader(path: &Path) -> io::Result<Box<dyn BufRead + Send>> {
    let mut raw = BufReader::with_capacity(READ_BUF_SIZE, File::open(path)?);
    let gzipped = raw.fill_buf()?.starts_with(&GZIP_MAGIC);
    if gzipped {
        Ok(Box::new(BufReader::with_capacity(
            READ_BUF_SIZE,
            MultiGzDecoder::new(raw),
        )))
    } else {
        Ok(Box::new(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use flate2::Compression;
    use flate2::write::GzEncoder;
    use tempfile::TempDir;

    fn http_err(status: u16) -> StreamError {
        StreamError::Http {
            status: Some(status),
            message: "test".to_string(),
        }
    }

    #[test]
    fn http_404_not_retryable() {
        assert!(!http_err(404).is_retryable());
        assert!(!http_err(403).is_retryable());
    }

    #[test]
    fn http_5xx_and_429_retryable() {
        assert!(http_err(500).is_retryable());
        assert!(http_err(503).is_retryable());
        assert!(http_err(429).is_retryable());
    }

    #[test]
    fn io_storage_full_not_retryable() {
        let err = StreamError::Io(io::Error::new(io::ErrorKind::StorageFull, "disk full"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn display_http_with_status() {
        assert_eq!(format!("{}", http_err(404)), "HTTP 404: test");
    }

    #[test]
    fn reads_plain_and_gzipped_lines() {
        let dir = TempDir::new().unwrap();
        let plain = dir.path().join("a.json");
        std::fs::write(&plain, "{\"eid\":\"1\"}\n{\"eid\":\"2\"}\n").unwrap();

        let gz = dir.path().join("b.json.gz");
        let mut enc = GzEncoder::new(File::create(&gz).unwrap(), Compression::default());
        enc.write_all(b"{\"eid\":\"3\"}\n").unwrap();
        enc.finish().unwrap();

        let lines: Vec<String> = open_text_reader(&plain).unwrap().lines().map(|l| l.unwrap()).collect();
        assert_eq!(lines.len(), 2);
        let lines: Vec<String> = open_text_reader(&gz).unwrap().lines().map(|l| l.unwrap()).collect();
        assert_eq!(lines, vec!["{\"eid\":\"3\"}".to_string()]);
    }

    #[test]
    fn reads_concatenated_gzip_members() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("multi.json.gz");
        let mut bytes = Vec::new();
        for line in ["{\"eid\":\"1\"}\n", "{\"eid\":\"2\"}\n"] {
            let mut enc = GzEncoder::new(Vec::new(), Compression::default());
            enc.write_all(line.as_bytes()).unwrap();
            bytes.extend(enc.finish().unwrap());
        }
        std::fs::write(&path, bytes).unwrap();

        let count = open_text_reader(&path).unwrap().lines().count();
        assert_eq!(count, 2);
    }
}
