use crate::error::Result;
use crate::project::Source;
use crate::relation::RelationDescriptor;
use crate::table::Table;
use crate::values::to_json_text;

use super::BuildContext;

pub(crate) static DESCRIPTOR: RelationDescriptor = RelationDescriptor {
    name: "authors",
    source: Source::Field {
        path: "authors",
        explode: true,
        opaque: &[],
    },
    optional: &[
        "author_position",
        "first_name",
        "last_name",
        "initials",
        "orcid",
        "scopus_author_id",
    ],
    required: &["affiliation_sequences"],
    empty_allowed: false,
    build,
};

fn build(ctx: &BuildContext<'_>) -> Result<Table> {
    let mut authors = DESCRIPTOR.source.project(ctx.store);
    authors.map_column("affiliation_sequences", to_json_text);
    let mut authors = DESCRIPTOR.enforce(authors)?;
    authors.retain_rows(|row| row.iter().any(|v| !v.is_null()));
    Ok(authors)
}
