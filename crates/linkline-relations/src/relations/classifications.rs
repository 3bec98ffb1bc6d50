//! Subject classifications: ASJC codes and unified fingerprint concepts

use crate::error::Result;
use crate::project::Source;
use crate::relation::RelationDescriptor;
use crate::table::Table;

use super::BuildContext;

pub(crate) static ASJCS: RelationDescriptor = RelationDescriptor {
    name: "asjcs",
    source: Source::Field {
        path: "asjcs",
        explode: true,
        opaque: &[],
    },
    optional: &["asjc_abbreviation", "asjc_description"],
    required: &["asjc_code"],
    empty_allowed: false,
    build: build_asjcs,
};

pub(crate) static UFCS: RelationDescriptor = RelationDescriptor {
    name: "ufcs",
    source: Source::Field {
        path: "unified_fingerprint_concepts",
        explode: true,
        opaque: &[],
    },
    optional: &["ufc_name", "ufc_rank"],
    required: &["ufc_id"],
    empty_allowed: false,
    build: build_ufcs,
};

fn build_asjcs(ctx: &BuildContext<'_>) -> Result<Table> {
    ASJCS.enforce(ASJCS.source.project(ctx.store))
}

fn build_ufcs(ctx: &BuildContext<'_>) -> Result<Table> {
    UFCS.enforce(UFCS.source.project(ctx.store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relations::fixtures::store;
    use serde_json::json;

    #[test]
    fn one_row_per_entry() {
        let s = store(&[
            json!({"eid": "1",
                "asjcs": [{"asjc_code": 2700, "asjc_abbreviation": "MEDI"}, {"asjc_code": 1300}],
                "unified_fingerprint_concepts": [{"ufc_id": "U1", "ufc_name": "Obesity", "ufc_rank": 1}]}),
            json!({"eid": "2", "asjcs": []}),
        ]);
        let ctx = BuildContext {
            store: &s,
            metadata: None,
        };
        let asjcs = build_asjcs(&ctx).unwrap();
        assert_eq!(asjcs.num_rows(), 2);
        assert_eq!(asjcs.columns(), &["asjc_abbreviation", "asjc_description", "asjc_code"]);
        let ufcs = build_ufcs(&ctx).unwrap();
        assert_eq!(ufcs.num_rows(), 1);
        assert_eq!(ufcs.value(0, "ufc_rank"), Some(&json!(1)));
    }
}
