//! Object sources the mirror can be synchronized from

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::MirrorError;

/// One listed object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    pub key: String,
    pub size: u64,
}

/// A flat keyspace of objects, S3 style.
pub trait ObjectSource: Send + Sync {
    /// Human-readable location, for logs.
    fn describe(&self) -> String;

    /// Every object whose key starts with `prefix`, sorted by key.
    fn list(&self, prefix: &str) -> Result<Vec<RemoteObject>, MirrorError>;

    /// Stream one object into `out`, returning the bytes written.
    fn fetch(&self, key: &str, out: &mut dyn Write) -> Result<u64, MirrorError>;
}

/// A local directory tree served as an object source (mounted buckets, tests).
#[derive(Debug, Clone)]
pub struct LocalDir {
    root: PathBuf,
}

impl LocalDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ObjectSource for LocalDir {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    fn list(&self, prefix: &str) -> Result<Vec<RemoteObject>, MirrorError> {
        let pattern = format!("{}/**/*", glob::Pattern::escape(&self.root.to_string_lossy()));
        let paths = glob::glob(&pattern).map_err(|e| MirrorError::Listing(e.to_string()))?;
        let mut objects = Vec::new();
        for path in paths.filter_map(Result::ok) {
            let meta = path.metadata().map_err(|e| MirrorError::io(&path, e))?;
            if !meta.is_file() {
                continue;
            }
            let Ok(rel) = path.strip_prefix(&self.root) else {
                continue;
            };
            let key = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if key.starts_with(prefix) {
                objects.push(RemoteObject {
                    key,
                    size: meta.len(),
                });
            }
        }
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }

    fn fetch(&self, key: &str, out: &mut dyn Write) -> Result<u64, MirrorError> {
        let path = self.root.join(key);
        let mut file = File::open(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => MirrorError::NotFound(key.to_string()),
            _ => MirrorError::io(&path, e),
        })?;
        io::copy(&mut file, out).map_err(|e| MirrorError::io(&path, e))
    }
}
