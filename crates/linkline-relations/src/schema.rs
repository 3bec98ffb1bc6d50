//! Schema enforcement: fixed, total column sets per relation

use crate::error::{IngestError, Result};
use crate::table::Table;

/// Conform `table` to exactly `optional + required`, in that order.
///
/// Absent optional columns are filled with nulls. An absent required column
/// is a [`IngestError::Schema`] failure, also when the projection is empty.
/// Undeclared columns are dropped.
pub fn enforce(
    relation: &'static str,
    table: Table,
    optional: &[&str],
    required: &[&str],
) -> Result<Table> {
    if let Some(&column) = required.iter().find(|c| !table.has_column(c)) {
        return Err(IngestError::Schema {
            relation,
            column: column.to_string(),
        });
    }
    Ok(conform(relation, table, optional, required))
}

/// Like [`enforce`], but an empty table gets every declared column
/// synthesized instead of failing.
pub fn enforce_or_empty(
    relation: &'static str,
    table: Table,
    optional: &[&str],
    required: &[&str],
) -> Result<Table> {
    if table.is_empty() {
        log::debug!("{relation}: empty, synthesizing declared columns");
        return Ok(table.select(&optional.iter().chain(required).copied().collect::<Vec<_>>()));
    }
    enforce(relation, table, optional, required)
}

fn conform(relation: &'static str, table: Table, optional: &[&str], required: &[&str]) -> Table {
    for &column in optional {
        if !table.has_column(column) {
            log::info!("{relation}: field {column} absent from batch, filling with nulls");
        }
    }

    let declared: Vec<&str> = optional.iter().chain(required).copied().collect();
    let dropped: Vec<&str> = table
        .columns()
        .iter()
        .map(String::as_str)
        .filter(|c| !declared.contains(c))
        .collect();
    if !dropped.is_empty() {
        log::debug!("{relation}: dropping undeclared fields {}", dropped.join(", "));
    }

    table.select(&declared)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::RowKey;
    use serde_json::{Value, json};
    use std::sync::Arc;

    fn one_row(columns: &[&str], values: Vec<Value>) -> Table {
        let mut t = Table::new(columns.iter().map(|c| c.to_string()).collect(), true);
        t.push_row(
            Some(RowKey {
                doc: 0,
                eid: Arc::from("E1"),
            }),
            values,
        );
        t
    }

    #[test]
    fn fills_optional_and_orders() {
        let t = one_row(&["extra", "b_req", "a_opt"], vec![json!(0), json!(1), json!(2)]);
        let t = enforce("test", t, &["a_opt", "z_opt"], &["b_req"]).unwrap();
        assert_eq!(t.columns(), &["a_opt", "z_opt", "b_req"]);
        assert_eq!(t.rows()[0], vec![json!(2), Value::Null, json!(1)]);
    }

    #[test]
    fn missing_required_fails_on_rows() {
        let t = one_row(&["a_opt"], vec![json!(1)]);
        let err = enforce("test", t, &["a_opt"], &["b_req"]).unwrap_err();
        match err {
            IngestError::Schema { relation, column } => {
                assert_eq!(relation, "test");
                assert_eq!(column, "b_req");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_required_fails_on_empty_projection() {
        let t = Table::new(Vec::new(), true);
        assert!(matches!(
            enforce("test", t, &["a_opt"], &["b_req"]),
            Err(IngestError::Schema { column, .. }) if column == "b_req"
        ));
    }

    #[test]
    fn empty_table_allowed_when_asked() {
        let t = Table::new(Vec::new(), false);
        let t = enforce_or_empty("test", t, &["a_opt"], &["b_req"]).unwrap();
        assert_eq!(t.columns(), &["a_opt", "b_req"]);
        assert!(t.is_empty());

        let t = one_row(&["a_opt"], vec![json!(1)]);
        assert!(enforce_or_empty("test", t, &["a_opt"], &["b_req"]).is_err());
    }
}
