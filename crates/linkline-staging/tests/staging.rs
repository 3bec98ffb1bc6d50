use linkline_relations::{
    Destination, IngestError, LoadOptions, RecordStore, RelationLoader, RunLabel, RunMetadata, WriteMode, load,
};
use linkline_staging::{StagingConfig, StagingDb};
use serde_json::json;
use tempfile::TempDir;

fn loader() -> RelationLoader {
    let docs = [
        json!({"eid": "E1", "publication_year": 2020, "doi": "10.1/a", "citation_count": 4,
               "asjcs": [{"asjc_code": 2700, "asjc_description": "Medicine"}],
               "identified_datasets": [{"identified_dataset_name": "NHANES", "snippets": ["x"],
                   "models": [{"model": "m", "score": 0.5}],
                   "linked_alias": {"alias_id": 1, "is_fuzzy": true}}],
               "authors": [{"author_position": 1, "last_name": "Doe", "affiliation_sequences": [1]},
                           {"author_position": 2, "last_name": "Roe", "affiliation_sequences": [1]}],
               "affiliations": [{"affiliation_ids": ["60000001"],
                   "affiliation_text": {"affiliation_organization": ["Some University"]},
                   "affiliation_normalized": {"name": "some university"}}],
               "topic": {"topic_id": 1, "keywords": ["diet"]},
               "topic_cluster": {"topic_cluster_id": 9, "keywords": ["health"]},
               "unified_fingerprint_concepts": [{"ufc_id": "U1"}]}),
        json!({"eid": "E2", "publication_year": 2021}),
    ];
    let text: Vec<String> = docs.iter().map(|d| d.to_string()).collect();
    let store = RecordStore::from_json_lines("t", &text.join("\n")).unwrap();
    let metadata = RunMetadata::from_json_str(
        r#"{"stats": {"documents_per_alias": [
            {"alias": "NHANES", "alias_id": 1, "parent_alias_id": 1, "alias_type": "parent"}
        ]}}"#,
    )
    .unwrap();
    RelationLoader::new(store, Some(metadata), Some(RunLabel::new("nsf", "v1")))
}

#[test]
fn loads_batch_into_database_file() {
    let dir = TempDir::new().unwrap();
    let config = StagingConfig {
        database: Some(dir.path().join("staging").join("linkline.duckdb")),
        ..StagingConfig::default()
    };
    let label = RunLabel::new("nsf", "v1");

    {
        let mut db = StagingDb::open(&config).unwrap();
        assert!(!db.has_run(&label).unwrap());
        let summary = load(&loader(), &LoadOptions::default(), &mut db).unwrap();
        assert_eq!(summary.tables.len(), 9);
    }

    // reopen: data persisted
    let db = StagingDb::open(&config).unwrap();
    assert!(db.has_run(&label).unwrap());
    assert_eq!(db.row_count("nsf_v1_publications").unwrap(), 2);
    assert_eq!(db.row_count("nsf_v1_dyads").unwrap(), 1);
    assert_eq!(db.row_count("nsf_v1_datasets").unwrap(), 1);
    assert_eq!(db.row_count("nsf_v1_authors").unwrap(), 2);
    for relation in linkline_relations::Relation::ALL {
        assert!(db.table_exists(&label.table_name(relation)).unwrap(), "{relation}");
    }
}

#[test]
fn reload_requires_force() {
    let mut db = StagingDb::open_in_memory().unwrap();
    let l = loader();
    load(&l, &LoadOptions::default(), &mut db).unwrap();

    let err = load(&l, &LoadOptions::default(), &mut db).unwrap_err();
    assert!(matches!(err, IngestError::Destination(_)));
    assert!(err.to_string().contains("already exists"));

    let summary = load(
        &l,
        &LoadOptions {
            force_overwrite: true,
        },
        &mut db,
    )
    .unwrap();
    assert_eq!(summary.tables[0].1, 2);
    assert_eq!(db.row_count("nsf_v1_publications").unwrap(), 2);
}

#[test]
fn write_table_replaces_contents() {
    let mut db = StagingDb::open_in_memory().unwrap();
    let l = loader();
    let asjcs = l.relation(linkline_relations::Relation::Asjcs).unwrap();
    db.write_table("t", &asjcs, WriteMode::FailIfExists).unwrap();
    assert!(db.table_exists("t").unwrap());
    db.write_table("t", &asjcs, WriteMode::Replace).unwrap();
    assert_eq!(db.row_count("t").unwrap(), 1);
    assert!(db.write_table("t", &asjcs, WriteMode::FailIfExists).is_err());
}
