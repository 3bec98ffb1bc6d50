//! Column projector: raw documents → flat tables

use serde_json::{Map, Value};

use crate::store::RecordStore;
use crate::table::{RowKey, Table, TableBuilder};

/// Where a relation's rows come from.
#[derive(Debug, Clone, Copy)]
pub enum Source {
    /// One row per document with the listed top-level fields.
    Document { fields: &'static [&'static str] },
    /// Rows projected from a (dotted) field of every document.
    Field {
        path: &'static str,
        explode: bool,
        opaque: &'static [&'static str],
    },
    /// Rows taken from the run metadata rather than the documents.
    Metadata,
}

impl Source {
    /// Project the store according to this source. Metadata sources yield an empty table.
    pub fn project(&self, store: &RecordStore) -> Table {
        match *self {
            Self::Document { fields } => select(store, fields),
            Self::Field {
                path,
                explode,
                opaque,
            } => project(store, path, explode, opaque),
            Self::Metadata => Table::new(Vec::new(), false),
        }
    }
}

/// One row per document; a column for each listed field present anywhere in the batch.
pub fn select(store: &RecordStore, fields: &[&str]) -> Table {
    let present: Vec<&str> = fields
        .iter()
        .copied()
        .filter(|f| store.documents().iter().any(|d| d.field(f).is_some()))
        .collect();

    let mut table = Table::new(present.iter().map(|f| f.to_string()).collect(), true);
    for (pos, doc) in store.documents().iter().enumerate() {
        let row = present
            .iter()
            .map(|f| doc.field(f).cloned().unwrap_or(Value::Null))
            .collect();
        table.push_row(Some(row_key(pos, store)), row);
    }
    table
}

/// Project the value at `path` of every document.
///
/// With `explode`, a list yields one row per non-null element and an absent,
/// null or empty list yields no rows; a non-list value counts as one
/// element. Without it, each document with a non-null value yields one row.
/// Object elements are flattened into dotted columns except at `opaque`
/// paths; lists are kept whole.
pub fn project(store: &RecordStore, path: &str, explode: bool, opaque: &[&str]) -> Table {
    let leaf = path.rsplit('.').next().unwrap_or(path);
    let mut builder = TableBuilder::keyed();

    for (pos, doc) in store.documents().iter().enumerate() {
        let Some(value) = doc.lookup(path) else {
            continue;
        };
        match value {
            Value::Null => {}
            Value::Array(items) if explode => {
                for item in items.iter().filter(|v| !v.is_null()) {
                    builder.push_record(Some(row_key(pos, store)), element_cells(item, leaf, opaque));
                }
            }
            other => builder.push_record(Some(row_key(pos, store)), element_cells(other, leaf, opaque)),
        }
    }
    builder.finish()
}

fn row_key(pos: usize, store: &RecordStore) -> RowKey {
    RowKey {
        doc: pos,
        eid: store.documents()[pos].eid_arc().clone(),
    }
}

fn element_cells(element: &Value, leaf: &str, opaque: &[&str]) -> Vec<(String, Value)> {
    let mut cells = Vec::new();
    match element {
        Value::Object(map) => flatten("", map, opaque, &mut cells),
        other => cells.push((leaf.to_string(), other.clone())),
    }
    cells
}

fn flatten(prefix: &str, map: &Map<String, Value>, opaque: &[&str], out: &mut Vec<(String, Value)>) {
    for (key, value) in map {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Object(inner) if !opaque.contains(&name.as_str()) => {
                flatten(&name, inner, opaque, out)
            }
            _ => out.push((name, value.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store(lines: &[Value]) -> RecordStore {
        let text: Vec<String> = lines.iter().map(|v| v.to_string()).collect();
        RecordStore::from_json_lines("test", &text.join("\n")).unwrap()
    }

    #[test]
    fn select_only_present_fields() {
        let s = store(&[
            json!({"eid": "1", "doi": "10.1/a"}),
            json!({"eid": "2", "publication_year": 2020}),
        ]);
        let t = select(&s, &["doi", "missing", "publication_year"]);
        assert_eq!(t.columns(), &["doi", "publication_year"]);
        assert_eq!(t.num_rows(), 2);
        assert_eq!(t.value(1, "doi"), Some(&Value::Null));
    }

    #[test]
    fn explode_row_counts() {
        let s = store(&[
            json!({"eid": "1", "asjcs": [{"asjc_code": 1}, {"asjc_code": 2}, {"asjc_code": 3}]}),
            json!({"eid": "2", "asjcs": []}),
            json!({"eid": "3"}),
            json!({"eid": "4", "asjcs": null}),
            json!({"eid": "5", "asjcs": [null, {"asjc_code": 9}]}),
        ]);
        let t = project(&s, "asjcs", true, &[]);
        assert_eq!(t.num_rows(), 4);
        let eids: Vec<_> = t.keys().unwrap().iter().map(|k| k.eid.to_string()).collect();
        assert_eq!(eids, vec!["1", "1", "1", "5"]);
    }

    #[test]
    fn flattens_nested_objects_except_opaque() {
        let s = store(&[json!({
            "eid": "1",
            "affiliations": [{
                "affiliation_text": {"affiliation_city": "Oslo"},
                "affiliation_normalized": {"country": "NO"},
                "affiliation_ids": ["1", "2"]
            }]
        })]);
        let t = project(&s, "affiliations", true, &["affiliation_normalized"]);
        assert!(t.has_column("affiliation_text.affiliation_city"));
        assert_eq!(t.value(0, "affiliation_normalized"), Some(&json!({"country": "NO"})));
        assert_eq!(t.value(0, "affiliation_ids"), Some(&json!(["1", "2"])));
    }

    #[test]
    fn single_object_without_explode() {
        let s = store(&[
            json!({"eid": "1", "topic": {"topic_id": 7, "keywords": ["a"]}}),
            json!({"eid": "2"}),
            json!({"eid": "3", "topic": null}),
        ]);
        let t = project(&s, "topic", false, &[]);
        assert_eq!(t.num_rows(), 1);
        assert_eq!(t.value(0, "topic_id"), Some(&json!(7)));
    }

    #[test]
    fn scalar_elements_use_leaf_name() {
        let s = store(&[json!({"eid": "1", "journal": {"citescore": 4.2}})]);
        let t = project(&s, "journal.citescore", true, &[]);
        assert_eq!(t.columns(), &["citescore"]);
        assert_eq!(t.value(0, "citescore"), Some(&json!(4.2)));
    }
}
