use crate::error::Result;
use crate::project::{Source, project};
use crate::relation::RelationDescriptor;
use crate::table::Table;
use crate::values::{join_list, to_json_text};

use super::BuildContext;

const FIELDS: &[&str] = &[
    "doi",
    "publication_title",
    "publication_type",
    "publication_year",
    "publication_month",
    "citation_count",
    "field_weighted_citation_impact",
    "journal_publishername",
    "journal_title",
    "journal_scopus_source_id",
    "journal_issn_isbn",
    "expressions",
];

const CITESCORE_PATH: &str = "journal_citescore";
const CITESCORE_PREFIX: &str = "journal_";

pub(crate) static DESCRIPTOR: RelationDescriptor = RelationDescriptor {
    name: "publications",
    source: Source::Document { fields: FIELDS },
    optional: &[
        "doi",
        "publication_title",
        "publication_type",
        "publication_month",
        "citation_count",
        "field_weighted_citation_impact",
        "journal_publishername",
        "journal_title",
        "journal_scopus_source_id",
        "journal_issn_isbn",
        "tested_expressions",
        "journal_year",
        "journal_citescore",
    ],
    required: &["publication_year"],
    empty_allowed: false,
    build,
};

fn build(ctx: &BuildContext<'_>) -> Result<Table> {
    let mut base = DESCRIPTOR.source.project(ctx.store);
    base.map_column("journal_issn_isbn", |v| join_list(v, "|"));
    base.map_column("expressions", to_json_text);
    base.rename_column("expressions", "tested_expressions");

    // One row per citescore entry; entries are {year, citescore} objects.
    let mut citescore = project(ctx.store, CITESCORE_PATH, true, &[]);
    citescore.rename_with(|c| {
        (!c.starts_with(CITESCORE_PREFIX)).then(|| format!("{CITESCORE_PREFIX}{c}"))
    });

    DESCRIPTOR.enforce(base.left_join(&citescore))
}
