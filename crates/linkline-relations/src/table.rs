//! In-memory relation tables
//!
//! A [`Table`] is row-major: ordered column names plus one `Vec<Value>` per
//! row, `Value::Null` standing for a missing cell. Tables projected from
//! documents also carry one [`RowKey`] per row pointing back at the parent
//! document.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Value;

/// Back-reference from a projected row to its parent document.
///
/// `doc` is the document's position in the record store and is what joins
/// use; `eid` is carried along for output and validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowKey {
    pub doc: usize,
    pub eid: Arc<str>,
}

/// Storage type of a column at the persistence/export boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Boolean,
    Int64,
    Float64,
    Utf8,
}

impl ColumnType {
    /// Infer a column type from its non-null values.
    pub fn infer<'a>(values: impl IntoIterator<Item = &'a Value>) -> Self {
        let (mut all_bool, mut all_int, mut all_num, mut seen) = (true, true, true, false);
        for value in values {
            if value.is_null() {
                continue;
            }
            seen = true;
            all_bool &= value.is_boolean();
            all_int &= value.as_i64().is_some();
            all_num &= value.is_number();
        }
        match (seen, all_bool, all_int, all_num) {
            (false, ..) => Self::Utf8,
            (true, true, ..) => Self::Boolean,
            (true, _, true, _) => Self::Int64,
            (true, _, _, true) => Self::Float64,
            _ => Self::Utf8,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Int64 => "int64",
            Self::Float64 => "float64",
            Self::Utf8 => "utf8",
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text form of a cell for string columns: strings unquoted, everything
/// else (numbers, lists, objects) as compact JSON.
pub fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    keys: Option<Vec<RowKey>>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Empty table with the given columns.
    pub fn new(columns: Vec<String>, keyed: bool) -> Self {
        Self {
            columns,
            keys: keyed.then(Vec::new),
            rows: Vec::new(),
        }
    }

    /// Append a row. `key` is ignored for unkeyed tables.
    pub fn push_row(&mut self, key: Option<RowKey>, row: Vec<Value>) {
        debug_assert_eq!(row.len(), self.columns.len());
        if let (Some(keys), Some(key)) = (self.keys.as_mut(), key) {
            keys.push(key);
        }
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn keys(&self) -> Option<&[RowKey]> {
        self.keys.as_deref()
    }

    pub fn is_keyed(&self) -> bool {
        self.keys.is_some()
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Cell at `row` in column `name`, `None` if the column does not exist.
    pub fn value(&self, row: usize, name: &str) -> Option<&Value> {
        let pos = self.position(name)?;
        self.rows.get(row).map(|r| &r[pos])
    }

    /// All cells of a column.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &Value>> {
        let pos = self.position(name)?;
        Some(self.rows.iter().map(move |r| &r[pos]))
    }

    /// Inferred storage type of every column, in column order.
    pub fn column_types(&self) -> Vec<ColumnType> {
        (0..self.columns.len())
            .map(|i| ColumnType::infer(self.rows.iter().map(|r| &r[i])))
            .collect()
    }

    /// Replace every cell of a column. Returns false if the column is absent.
    pub fn map_column(&mut self, name: &str, mut f: impl FnMut(Value) -> Value) -> bool {
        let Some(pos) = self.position(name) else {
            return false;
        };
        for row in &mut self.rows {
            let cell = std::mem::take(&mut row[pos]);
            row[pos] = f(cell);
        }
        true
    }

    /// Compute `target` from `source`, cell by cell. No-op if `source` is absent.
    pub fn derive_column(&mut self, source: &str, target: &str, mut f: impl FnMut(&Value) -> Value) {
        let Some(src) = self.position(source) else {
            return;
        };
        let values: Vec<Value> = self.rows.iter().map(|r| f(&r[src])).collect();
        self.set_column(target, values);
    }

    /// Set a column to `values`, replacing it if it exists, appending otherwise.
    pub fn set_column(&mut self, name: &str, values: Vec<Value>) {
        debug_assert_eq!(values.len(), self.rows.len());
        match self.position(name) {
            Some(pos) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[pos] = value;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
    }

    /// Rename a column. An existing column named `to` is replaced.
    pub fn rename_column(&mut self, from: &str, to: &str) {
        if from == to || !self.has_column(from) {
            return;
        }
        self.drop_column(to);
        if let Some(pos) = self.position(from) {
            self.columns[pos] = to.to_string();
        }
    }

    /// Rename every column for which `f` returns a new name.
    pub fn rename_with(&mut self, f: impl Fn(&str) -> Option<String>) {
        let renames: Vec<(String, String)> = self
            .columns
            .iter()
            .filter_map(|c| f(c).map(|to| (c.clone(), to)))
            .collect();
        for (from, to) in renames {
            self.rename_column(&from, &to);
        }
    }

    pub fn drop_column(&mut self, name: &str) {
        if let Some(pos) = self.position(name) {
            self.columns.remove(pos);
            for row in &mut self.rows {
                row.remove(pos);
            }
        }
    }

    /// Expand list cells of `name` into one row per element.
    ///
    /// An empty list becomes a single row with a null cell; non-list cells
    /// (including null) are kept as they are. Exploding several columns in
    /// sequence yields their cartesian combination.
    pub fn explode(&mut self, name: &str) {
        let Some(pos) = self.position(name) else {
            return;
        };
        let old_rows = std::mem::take(&mut self.rows);
        let old_keys = self.keys.take();
        let mut keys = old_keys.as_ref().map(|k| Vec::with_capacity(k.len()));

        for (i, mut row) in old_rows.into_iter().enumerate() {
            let key = old_keys.as_ref().map(|k| k[i].clone());
            let items = match std::mem::take(&mut row[pos]) {
                Value::Array(items) if items.is_empty() => vec![Value::Null],
                Value::Array(items) => items,
                other => vec![other],
            };
            for item in items {
                let mut out = row.clone();
                out[pos] = item;
                if let (Some(keys), Some(key)) = (keys.as_mut(), key.clone()) {
                    keys.push(key);
                }
                self.rows.push(out);
            }
        }
        self.keys = keys;
    }

    /// Left join on the parent document.
    ///
    /// Each row of `self` is combined with every row of `other` sharing its
    /// parent document; rows without a match are kept with nulls. Unkeyed
    /// tables have nothing to join on and are returned unchanged.
    pub fn left_join(self, other: &Table) -> Table {
        let (Some(keys), Some(other_keys)) = (self.keys.as_ref(), other.keys.as_ref()) else {
            return self;
        };

        let mut by_doc: FxHashMap<usize, Vec<usize>> = FxHashMap::default();
        for (i, key) in other_keys.iter().enumerate() {
            by_doc.entry(key.doc).or_default().push(i);
        }

        let mut columns = self.columns.clone();
        columns.extend(other.columns.iter().cloned());
        let mut joined = Table::new(columns, true);
        let nulls = vec![Value::Null; other.columns.len()];

        for (row, key) in self.rows.iter().zip(keys) {
            match by_doc.get(&key.doc) {
                Some(matches) => {
                    for &j in matches {
                        let mut out = row.clone();
                        out.extend(other.rows[j].iter().cloned());
                        joined.push_row(Some(key.clone()), out);
                    }
                }
                None => {
                    let mut out = row.clone();
                    out.extend(nulls.iter().cloned());
                    joined.push_row(Some(key.clone()), out);
                }
            }
        }
        joined
    }

    /// Drop rows identical (parent eid and every cell) to an earlier row.
    pub fn dedup(&mut self) {
        let mut seen: FxHashSet<String> = FxHashSet::default();
        let old_rows = std::mem::take(&mut self.rows);
        let old_keys = self.keys.take();
        let mut keys = old_keys.as_ref().map(|k| Vec::with_capacity(k.len()));

        for (i, row) in old_rows.into_iter().enumerate() {
            let key = old_keys.as_ref().map(|k| k[i].clone());
            let eid = key.as_ref().map_or("", |k| &*k.eid);
            let fingerprint = format!("{eid}\u{1f}{}", Value::Array(row.clone()));
            if seen.insert(fingerprint) {
                if let (Some(keys), Some(key)) = (keys.as_mut(), key) {
                    keys.push(key);
                }
                self.rows.push(row);
            }
        }
        self.keys = keys;
    }

    /// Keep only rows for which `keep` returns true.
    pub fn retain_rows(&mut self, mut keep: impl FnMut(&[Value]) -> bool) {
        let old_rows = std::mem::take(&mut self.rows);
        let old_keys = self.keys.take();
        let mut keys = old_keys.as_ref().map(|k| Vec::with_capacity(k.len()));

        for (i, row) in old_rows.into_iter().enumerate() {
            if keep(&row) {
                if let (Some(keys), Some(old)) = (keys.as_mut(), old_keys.as_ref()) {
                    keys.push(old[i].clone());
                }
                self.rows.push(row);
            }
        }
        self.keys = keys;
    }

    /// Reorder to exactly `names`; columns not present become all-null.
    pub fn select(mut self, names: &[&str]) -> Table {
        let positions: Vec<Option<usize>> = names.iter().map(|n| self.position(n)).collect();
        let rows = std::mem::take(&mut self.rows)
            .into_iter()
            .map(|mut row| {
                positions
                    .iter()
                    .map(|p| p.map_or(Value::Null, |i| std::mem::take(&mut row[i])))
                    .collect()
            })
            .collect();
        Table {
            columns: names.iter().map(|n| n.to_string()).collect(),
            keys: self.keys,
            rows,
        }
    }
}

/// Accumulates records whose columns are discovered on the fly.
///
/// Columns are ordered by first appearance; rows that predate a column are
/// padded with nulls in [`finish`](TableBuilder::finish).
#[derive(Debug, Default)]
pub struct TableBuilder {
    columns: Vec<String>,
    lookup: FxHashMap<String, usize>,
    keys: Option<Vec<RowKey>>,
    rows: Vec<Vec<Value>>,
}

impl TableBuilder {
    pub fn keyed() -> Self {
        Self {
            keys: Some(Vec::new()),
            ..Self::default()
        }
    }

    pub fn unkeyed() -> Self {
        Self::default()
    }

    pub fn push_record(&mut self, key: Option<RowKey>, cells: impl IntoIterator<Item = (String, Value)>) {
        let mut row = vec![Value::Null; self.columns.len()];
        for (name, value) in cells {
            let idx = match self.lookup.get(&name) {
                Some(&idx) => idx,
                None => {
                    let idx = self.columns.len();
                    self.lookup.insert(name.clone(), idx);
                    self.columns.push(name);
                    row.push(Value::Null);
                    idx
                }
            };
            row[idx] = value;
        }
        if let (Some(keys), Some(key)) = (self.keys.as_mut(), key) {
            keys.push(key);
        }
        self.rows.push(row);
    }

    pub fn finish(self) -> Table {
        let width = self.columns.len();
        let rows = self
            .rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Value::Null);
                row
            })
            .collect();
        Table {
            columns: self.columns,
            keys: self.keys,
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(doc: usize, eid: &str) -> RowKey {
        RowKey {
            doc,
            eid: Arc::from(eid),
        }
    }

    fn table(columns: &[&str], rows: Vec<(usize, Vec<Value>)>) -> Table {
        let mut t = Table::new(columns.iter().map(|c| c.to_string()).collect(), true);
        for (doc, row) in rows {
            t.push_row(Some(key(doc, &format!("E{doc}"))), row);
        }
        t
    }

    #[test]
    fn infer_types() {
        assert_eq!(ColumnType::infer(&[json!(true), Value::Null]), ColumnType::Boolean);
        assert_eq!(ColumnType::infer(&[json!(1), json!(-2)]), ColumnType::Int64);
        assert_eq!(ColumnType::infer(&[json!(1), json!(2.5)]), ColumnType::Float64);
        assert_eq!(ColumnType::infer(&[json!(1), json!("x")]), ColumnType::Utf8);
        assert_eq!(ColumnType::infer(&[json!(true), json!(1)]), ColumnType::Utf8);
        assert_eq!(ColumnType::infer(&[Value::Null]), ColumnType::Utf8);
        assert_eq!(ColumnType::infer(&[json!([1, 2])]), ColumnType::Utf8);
    }

    #[test]
    fn cell_text_forms() {
        assert_eq!(cell_text(&json!("a")), Some("a".to_string()));
        assert_eq!(cell_text(&json!(3)), Some("3".to_string()));
        assert_eq!(cell_text(&json!([1, "b"])), Some("[1,\"b\"]".to_string()));
        assert_eq!(cell_text(&Value::Null), None);
    }

    #[test]
    fn builder_pads_late_columns() {
        let mut b = TableBuilder::keyed();
        b.push_record(Some(key(0, "E0")), [("a".to_string(), json!(1))]);
        b.push_record(
            Some(key(1, "E1")),
            [("b".to_string(), json!(2)), ("a".to_string(), json!(3))],
        );
        let t = b.finish();
        assert_eq!(t.columns(), &["a", "b"]);
        assert_eq!(t.rows()[0], vec![json!(1), Value::Null]);
        assert_eq!(t.rows()[1], vec![json!(3), json!(2)]);
        assert_eq!(t.keys().unwrap().len(), 2);
    }

    #[test]
    fn explode_pandas_semantics() {
        let mut t = table(
            &["s", "x"],
            vec![
                (0, vec![json!(["a", "b"]), json!(1)]),
                (1, vec![json!([]), json!(2)]),
                (2, vec![Value::Null, json!(3)]),
                (3, vec![json!("scalar"), json!(4)]),
            ],
        );
        t.explode("s");
        let s: Vec<_> = t.column("s").unwrap().cloned().collect();
        assert_eq!(s, vec![json!("a"), json!("b"), Value::Null, Value::Null, json!("scalar")]);
        let docs: Vec<_> = t.keys().unwrap().iter().map(|k| k.doc).collect();
        assert_eq!(docs, vec![0, 0, 1, 2, 3]);
    }

    #[test]
    fn explode_twice_is_cartesian() {
        let mut t = table(&["a", "b"], vec![(0, vec![json!([1, 2]), json!(["x", "y", "z"])])]);
        t.explode("a");
        t.explode("b");
        assert_eq!(t.num_rows(), 6);
    }

    #[test]
    fn left_join_by_document() {
        let base = table(&["y"], vec![(0, vec![json!(2020)]), (1, vec![json!(2021)])]);
        let other = table(
            &["c"],
            vec![(0, vec![json!(1.5)]), (0, vec![json!(2.5)])],
        );
        let joined = base.left_join(&other);
        assert_eq!(joined.columns(), &["y", "c"]);
        assert_eq!(joined.num_rows(), 3);
        assert_eq!(joined.rows()[2], vec![json!(2021), Value::Null]);
    }

    #[test]
    fn left_join_uses_position_not_eid() {
        // two documents sharing an eid must not multiply each other's rows
        let mut base = Table::new(vec!["y".to_string()], true);
        base.push_row(Some(key(0, "DUP")), vec![json!(1)]);
        base.push_row(Some(key(1, "DUP")), vec![json!(2)]);
        let mut other = Table::new(vec!["c".to_string()], true);
        other.push_row(Some(key(0, "DUP")), vec![json!("a")]);
        other.push_row(Some(key(1, "DUP")), vec![json!("b")]);
        let joined = base.left_join(&other);
        assert_eq!(joined.num_rows(), 2);
    }

    #[test]
    fn dedup_keeps_first_and_respects_eid() {
        let mut t = table(
            &["v"],
            vec![
                (0, vec![json!("a")]),
                (0, vec![json!("a")]),
                (1, vec![json!("a")]),
                (0, vec![json!("b")]),
            ],
        );
        t.dedup();
        assert_eq!(t.num_rows(), 3);
        let docs: Vec<_> = t.keys().unwrap().iter().map(|k| k.doc).collect();
        assert_eq!(docs, vec![0, 1, 0]);
    }

    #[test]
    fn select_fills_and_orders() {
        let t = table(&["a", "b"], vec![(0, vec![json!(1), json!(2)])]);
        let t = t.select(&["b", "c", "a"]);
        assert_eq!(t.columns(), &["b", "c", "a"]);
        assert_eq!(t.rows()[0], vec![json!(2), Value::Null, json!(1)]);
    }

    #[test]
    fn rename_replaces_existing_target() {
        let mut t = table(&["a", "b"], vec![(0, vec![json!(1), json!(2)])]);
        t.rename_column("a", "b");
        assert_eq!(t.columns(), &["b"]);
        assert_eq!(t.rows()[0], vec![json!(1)]);
    }

    #[test]
    fn retain_rows_keeps_keys_aligned() {
        let mut t = table(
            &["a"],
            vec![(0, vec![Value::Null]), (1, vec![json!(1)])],
        );
        t.retain_rows(|row| row.iter().any(|v| !v.is_null()));
        assert_eq!(t.num_rows(), 1);
        assert_eq!(t.keys().unwrap()[0].doc, 1);
    }
}
