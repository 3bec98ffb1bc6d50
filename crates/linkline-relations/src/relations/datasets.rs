use crate::error::Result;
use crate::project::Source;
use crate::relation::RelationDescriptor;
use crate::table::{Table, TableBuilder};

use super::BuildContext;

pub(crate) static DESCRIPTOR: RelationDescriptor = RelationDescriptor {
    name: "datasets",
    source: Source::Metadata,
    optional: &[],
    required: &["alias", "alias_id", "parent_alias_id", "alias_type"],
    empty_allowed: true,
    build,
};

fn build(ctx: &BuildContext<'_>) -> Result<Table> {
    let mut builder = TableBuilder::unkeyed();
    if let Some(metadata) = ctx.metadata {
        for record in metadata.alias_records() {
            builder.push_record(None, record.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
    } else {
        log::debug!("datasets: no run metadata, relation is empty");
    }
    DESCRIPTOR.enforce(builder.finish())
}
