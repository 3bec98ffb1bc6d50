use crate::error::Result;
use crate::project::Source;
use crate::relation::RelationDescriptor;
use crate::table::Table;
use crate::values::join_list;

use super::BuildContext;

pub(crate) static TOPICS: RelationDescriptor = RelationDescriptor {
    name: "topics",
    source: Source::Field {
        path: "topic",
        explode: false,
        opaque: &[],
    },
    optional: &["topic_id", "topic_name", "topic_prominence"],
    required: &["keywords"],
    empty_allowed: false,
    build: build_topics,
};

pub(crate) static TOPIC_CLUSTERS: RelationDescriptor = RelationDescriptor {
    name: "topicclusters",
    source: Source::Field {
        path: "topic_cluster",
        explode: false,
        opaque: &[],
    },
    optional: &[
        "topic_cluster_id",
        "topic_cluster_name",
        "topic_cluster_prominence",
    ],
    required: &["keywords"],
    empty_allowed: false,
    build: build_topic_clusters,
};

fn build_topics(ctx: &BuildContext<'_>) -> Result<Table> {
    with_keywords(&TOPICS, ctx)
}

fn build_topic_clusters(ctx: &BuildContext<'_>) -> Result<Table> {
    with_keywords(&TOPIC_CLUSTERS, ctx)
}

fn with_keywords(descriptor: &RelationDescriptor, ctx: &BuildContext<'_>) -> Result<Table> {
    let mut table = descriptor.source.project(ctx.store);
    table.map_column("keywords", |v| join_list(v, "|"));
    descriptor.enforce(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relations::fixtures::store;
    use serde_json::{Value, json};

    #[test]
    fn keywords_joined_and_null_kept() {
        let s = store(&[
            json!({"eid": "1", "topic": {"topic_id": 5, "topic_name": "T", "keywords": ["a", "b"]}}),
            json!({"eid": "2", "topic": {"topic_id": 6, "keywords": null}}),
            json!({"eid": "3"}),
        ]);
        let ctx = BuildContext {
            store: &s,
            metadata: None,
        };
        let t = build_topics(&ctx).unwrap();
        assert_eq!(t.num_rows(), 2);
        assert_eq!(t.value(0, "keywords"), Some(&json!("a|b")));
        assert_eq!(t.value(1, "keywords"), Some(&Value::Null));
        assert_eq!(t.value(1, "topic_prominence"), Some(&Value::Null));

        let clusters = build_topic_clusters(&ctx).unwrap();
        assert!(clusters.is_empty());
        assert_eq!(clusters.columns().len(), 4);
    }
}
