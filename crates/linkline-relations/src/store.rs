//! Record store: raw documents decoded from line-delimited JSON files

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde_json::{Map, Value};

use crate::error::{IngestError, Result};

/// One raw input record.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    eid: Arc<str>,
    src_file: Arc<str>,
    fields: Map<String, Value>,
}

impl Document {
    /// Build a document from a decoded JSON line.
    ///
    /// The root must be an object carrying an `eid` (string, or integer
    /// which is stringified).
    pub fn from_value(value: Value, src_file: Arc<str>) -> std::result::Result<Self, String> {
        let Value::Object(mut fields) = value else {
            return Err("record is not a JSON object".to_string());
        };
        let eid: Arc<str> = match fields.remove("eid") {
            Some(Value::String(s)) => s.into(),
            Some(Value::Number(n)) if n.is_i64() || n.is_u64() => n.to_string().into(),
            Some(_) => return Err("field 'eid' is not a string".to_string()),
            None => return Err("record has no 'eid'".to_string()),
        };
        Ok(Self {
            eid,
            src_file,
            fields,
        })
    }

    pub fn eid(&self) -> &str {
        &self.eid
    }

    pub(crate) fn eid_arc(&self) -> &Arc<str> {
        &self.eid
    }

    pub fn src_file(&self) -> &str {
        &self.src_file
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Top-level field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Field at a dotted path (`journal.citescore`), descending through objects.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.fields.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }
}

/// Immutable collection of every document of a batch, in input order.
#[derive(Debug, Clone)]
pub struct RecordStore {
    documents: Vec<Document>,
    files: Vec<PathBuf>,
}

impl RecordStore {
    /// Decode `files` (plain or gzip-compressed JSON lines) in parallel.
    pub fn load(files: &[PathBuf]) -> Result<Self> {
        let per_file: Vec<Vec<Document>> = files
            .par_iter()
            .map(|path| read_file(path))
            .collect::<Result<_>>()?;

        let documents: Vec<Document> = per_file.into_iter().flatten().collect();
        if documents.is_empty() {
            return Err(IngestError::load(
                files
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
                "no documents loaded",
            ));
        }
        log::debug!("loaded {} documents from {} files", documents.len(), files.len());
        Ok(Self {
            documents,
            files: files.to_vec(),
        })
    }

    /// Store over already-decoded documents.
    pub fn from_documents(documents: Vec<Document>) -> Result<Self> {
        if documents.is_empty() {
            return Err(IngestError::load("<memory>", "no documents loaded"));
        }
        Ok(Self {
            documents,
            files: Vec::new(),
        })
    }

    /// Decode JSON lines held in memory, labelled `name` as their source.
    pub fn from_json_lines(name: &str, text: &str) -> Result<Self> {
        let documents = parse_lines(name, text.lines().map(|l| Ok(l.to_string())))?;
        Self::from_documents(documents)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Occurrences of every eid.
    pub fn eid_counts(&self) -> FxHashMap<&str, usize> {
        let mut counts: FxHashMap<&str, usize> = FxHashMap::default();
        for doc in &self.documents {
            *counts.entry(doc.eid()).or_default() += 1;
        }
        counts
    }

    /// Highest number of times any single eid occurs.
    pub fn max_eid_occurrences(&self) -> usize {
        self.eid_counts().into_values().max().unwrap_or(0)
    }

    /// Eids occurring more than once, sorted.
    pub fn duplicate_eids(&self) -> Vec<String> {
        let mut dups: Vec<String> = self
            .eid_counts()
            .into_iter()
            .filter(|&(_, n)| n > 1)
            .map(|(eid, _)| eid.to_string())
            .collect();
        dups.sort_unstable();
        dups
    }
}

fn read_file(path: &Path) -> Result<Vec<Document>> {
    let reader = linkline_core::open_text_reader(path).map_err(|e| IngestError::io(path, e))?;
    parse_lines(&path.display().to_string(), reader.lines())
}

/// Decode one document per non-blank line. Read failures past the open
/// (truncated gzip, invalid UTF-8) are load errors at the offending line.
fn parse_lines(name: &str, lines: impl Iterator<Item = io::Result<String>>) -> Result<Vec<Document>> {
    let src: Arc<str> = Arc::from(name);
    let mut documents = Vec::new();
    for (idx, line) in lines.enumerate() {
        let location = || format!("{name}:{}", idx + 1);
        let line = line.map_err(|e| IngestError::load(location(), e))?;
        if line.trim().is_empty() {
            continue;
        }
        let value: Value =
            sonic_rs::from_str(&line).map_err(|e| IngestError::load(location(), e))?;
        let doc = Document::from_value(value, Arc::clone(&src))
            .map_err(|msg| IngestError::load(location(), msg))?;
        documents.push(doc);
    }
    Ok(documents)
}
