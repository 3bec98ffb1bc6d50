use crate::error::Result;
use crate::project::Source;
use crate::relation::RelationDescriptor;
use crate::table::Table;
use crate::values::{first_as_int, join_list, to_json_text};

use super::BuildContext;

const TEXT_PREFIX: &str = "affiliation_text.";

pub(crate) static DESCRIPTOR: RelationDescriptor = RelationDescriptor {
    name: "affiliations",
    source: Source::Field {
        path: "affiliations",
        explode: true,
        opaque: &["affiliation_normalized"],
    },
    optional: &[
        "affiliation_sequence",
        "affiliation_city",
        "affiliation_state",
        "affiliation_country",
        "affiliation_postal_code",
        "affiliation_address",
    ],
    required: &[
        "affiliation_id",
        "affiliation_ids",
        "affiliation_organization",
        "affiliation_normalized",
    ],
    empty_allowed: false,
    build,
};

fn build(ctx: &BuildContext<'_>) -> Result<Table> {
    let mut affiliations = DESCRIPTOR.source.project(ctx.store);
    affiliations.rename_with(|c| c.strip_prefix(TEXT_PREFIX).map(str::to_string));
    affiliations.map_column("affiliation_organization", |v| join_list(v, ", "));
    affiliations.derive_column("affiliation_ids", "affiliation_id", first_as_int);
    affiliations.map_column("affiliation_ids", |v| join_list(v, "|"));
    affiliations.map_column("affiliation_normalized", to_json_text);
    DESCRIPTOR.enforce(affiliations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relations::fixtures::store;
    use serde_json::json;

    #[test]
    fn flattens_text_and_derives_ids() {
        let s = store(&[json!({"eid": "1", "affiliations": [{
            "affiliation_sequence": 1,
            "affiliation_ids": ["60012345", "60000001"],
            "affiliation_text": {
                "affiliation_city": "Oslo",
                "affiliation_country": "Norway",
                "affiliation_organization": ["University of Oslo", "Dept. of Biology"]
            },
            "affiliation_normalized": {"org": "uio", "ids": [1]}
        }]})]);
        let t = build(&BuildContext {
            store: &s,
            metadata: None,
        })
        .unwrap();
        assert_eq!(t.num_rows(), 1);
        assert_eq!(t.value(0, "affiliation_city"), Some(&json!("Oslo")));
        assert_eq!(
            t.value(0, "affiliation_organization"),
            Some(&json!("University of Oslo, Dept. of Biology"))
        );
        assert_eq!(t.value(0, "affiliation_id"), Some(&json!(60012345)));
        assert_eq!(t.value(0, "affiliation_ids"), Some(&json!("60012345|60000001")));
        let normalized = t.value(0, "affiliation_normalized").and_then(|v| v.as_str()).unwrap();
        let normalized: serde_json::Value = serde_json::from_str(normalized).unwrap();
        assert_eq!(normalized, json!({"org": "uio", "ids": [1]}));
        assert_eq!(t.columns().len(), 10);
    }
}
