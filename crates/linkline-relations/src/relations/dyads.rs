use serde_json::Value;

use crate::error::Result;
use crate::project::Source;
use crate::relation::RelationDescriptor;
use crate::table::Table;

use super::BuildContext;

/// Placeholder exporters write when no snippet could be extracted.
const SNIPPET_PLACEHOLDER: &str = "Not Available";

const RENAMES: &[(&str, &str)] = &[
    ("snippets", "snippet"),
    ("linked_alias.fuzzy_score", "fuzzy_score"),
    ("linked_alias.is_fuzzy", "is_fuzzy"),
    ("linked_alias.alias_id", "alias_id"),
    ("identified_dataset_name", "alias"),
];

pub(crate) static DESCRIPTOR: RelationDescriptor = RelationDescriptor {
    name: "dyads",
    source: Source::Field {
        path: "identified_datasets",
        explode: true,
        opaque: &[],
    },
    optional: &["snippet", "fuzzy_score", "is_fuzzy", "model", "score"],
    required: &["alias", "alias_id"],
    empty_allowed: false,
    build,
};

fn build(ctx: &BuildContext<'_>) -> Result<Table> {
    let mut dyads = DESCRIPTOR.source.project(ctx.store);
    dyads.explode("snippets");
    dyads.explode("models");
    dyads.derive_column("models", "model", |m| m.get("model").cloned().unwrap_or(Value::Null));
    dyads.derive_column("models", "score", |m| m.get("score").cloned().unwrap_or(Value::Null));

    for (from, to) in RENAMES {
        dyads.rename_column(from, to);
    }
    dyads.drop_column("linked_alias.alias");
    dyads.drop_column("models");
    dyads.map_column("snippet", |v| match v {
        Value::String(s) if s.is_empty() || s == SNIPPET_PLACEHOLDER => Value::Null,
        other => other,
    });

    let mut dyads = DESCRIPTOR.enforce(dyads)?;
    dyads.dedup();
    Ok(dyads)
}
