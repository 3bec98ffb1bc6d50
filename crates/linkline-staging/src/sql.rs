//! SQL generation for staging tables.

use linkline_relations::ColumnType;

/// Quote an identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn sql_type(ty: ColumnType) -> &'static str {
    match ty {
        ColumnType::Boolean => "BOOLEAN",
        ColumnType::Int64 => "BIGINT",
        ColumnType::Float64 => "DOUBLE",
        ColumnType::Utf8 => "VARCHAR",
    }
}

/// Resource settings applied to every connection.
pub fn configure(memory_limit: &str, threads: usize) -> String {
    format!(
        "SET memory_limit = '{}';
         SET threads = {threads};",
        memory_limit.replace('\'', "''")
    )
}

/// `CREATE [OR REPLACE] TABLE` with one column per `(name, type)`.
pub fn create_table(table: &str, columns: &[(String, ColumnType)], replace: bool) -> String {
    let cols: Vec<String> = columns
        .iter()
        .map(|(name, ty)| format!("{} {}", quote_ident(name), sql_type(*ty)))
        .collect();
    format!(
        "CREATE {}TABLE {} ({})",
        if replace { "OR REPLACE " } else { "" },
        quote_ident(table),
        cols.join(", ")
    )
}

pub fn table_exists() -> &'static str {
    "SELECT count(*) FROM information_schema.tables WHERE table_name = ?"
}

pub fn row_count(table: &str) -> String {
    format!("SELECT count(*) FROM {}", quote_ident(table))
}
