//! `linkline validate` - check a mirrored batch against its run metadata

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Args;
use comfy_table::{Cell, Color};

use linkline_core::fmt_num;
use linkline_relations::RelationLoader;

use super::{label_from, styled_table};

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Run directory, or the mirror root when --agency and --version are given
    pub dir: PathBuf,

    #[arg(long)]
    pub agency: Option<String>,

    #[arg(long)]
    pub version: Option<String>,
}

fn verdict(ok: bool) -> Cell {
    if ok {
        Cell::new("pass").fg(Color::Green)
    } else {
        Cell::new("FAIL").fg(Color::Red)
    }
}

pub fn run(args: ValidateArgs) -> Result<()> {
    let label = label_from(args.agency, args.version)?;
    let loader = RelationLoader::from_dir(&args.dir, label)?;
    let report = loader.validation_report()?;

    let mut table = styled_table(&["Check", "Result"]);
    table.add_row(vec![
        Cell::new("Documents"),
        Cell::new(fmt_num(loader.store().len())),
    ]);
    table.add_row(vec![
        Cell::new("Publications per year match metadata"),
        verdict(report.year_counts_valid()),
    ]);
    table.add_row(vec![Cell::new("eids unique"), verdict(report.eids_unique())]);
    eprintln!("\n{table}");

    if !report.year_mismatches.is_empty() {
        let mut years = styled_table(&["Year", "Expected", "Found"]);
        for m in &report.year_mismatches {
            years.add_row(vec![
                Cell::new(m.publication_year),
                Cell::new(m.expected),
                Cell::new(m.observed),
            ]);
        }
        eprintln!("{years}");
    }

    if !report.is_valid() {
        bail!("{} failed validation: {}", loader.batch_name(), report.describe());
    }
    eprintln!("{} is valid", loader.batch_name());
    Ok(())
}
