//! `linkline dump` - print one relation of a batch

use anyhow::{Result, bail};
use clap::Args;
use comfy_table::Cell;

use linkline_relations::{Relation, RelationLoader, cell_text, export::EID_COLUMN};

use super::{BatchFiles, styled_table};

#[derive(Args, Debug)]
pub struct DumpArgs {
    /// Relation to print (publications, dyads, authors, ...)
    pub relation: Relation,

    #[command(flatten)]
    pub batch: BatchFiles,

    /// Only these columns, comma separated
    #[arg(long, value_delimiter = ',')]
    pub columns: Vec<String>,

    /// Maximum rows to print
    #[arg(short = 'n', long, default_value_t = 20)]
    pub limit: usize,
}

pub fn run(args: DumpArgs) -> Result<()> {
    let loader =
        RelationLoader::from_files(&args.batch.files, args.batch.metadata.as_deref(), None)?;
    let table = loader.relation(args.relation)?;

    let names: Vec<String> = if args.columns.is_empty() {
        table.columns().to_vec()
    } else {
        if let Some(unknown) = args.columns.iter().find(|c| !table.has_column(c)) {
            bail!(
                "{} has no column '{unknown}' (columns: {})",
                args.relation,
                table.columns().join(", ")
            );
        }
        args.columns.clone()
    };
    let positions: Vec<usize> = names.iter().filter_map(|n| table.position(n)).collect();

    let mut headers: Vec<&str> = Vec::with_capacity(names.len() + 1);
    if table.is_keyed() {
        headers.push(EID_COLUMN);
    }
    headers.extend(names.iter().map(String::as_str));
    let mut out = styled_table(&headers);

    for (idx, row) in table.rows().iter().enumerate().take(args.limit) {
        let mut cells: Vec<Cell> = Vec::with_capacity(headers.len());
        if let Some(keys) = table.keys() {
            cells.push(Cell::new(&keys[idx].eid));
        }
        cells.extend(
            positions
                .iter()
                .map(|&p| Cell::new(cell_text(&row[p]).unwrap_or_default())),
        );
        out.add_row(cells);
    }
    println!("{out}");

    let types: Vec<String> = table
        .columns()
        .iter()
        .zip(table.column_types())
        .filter(|(name, _)| names.contains(name))
        .map(|(name, ty)| format!("{name}: {ty}"))
        .collect();
    eprintln!(
        "{}: {} of {} rows shown",
        args.relation,
        table.num_rows().min(args.limit),
        table.num_rows()
    );
    eprintln!("column types: {}", types.join(", "));
    Ok(())
}
