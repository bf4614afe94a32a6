//! End-to-end scenarios exercising the full create/build/search/update/delete
//! lifecycle through the public `VectorDbCore` API, one index kind at a time.

use vectorcore::filter::{FieldFilter, Filter, Metadata};
use vectorcore::model::IndexKind;
use vectorcore::{CoreError, VectorDbCore};

const DIM: usize = 8;

fn meta() -> Metadata {
    Metadata::new()
}

#[test]
fn linear_library_returns_exact_text_match_first() {
    let db = VectorDbCore::new(DIM);
    let library = db
        .libraries()
        .create("docs".into(), IndexKind::Linear, DIM, meta(), meta())
        .unwrap();

    for text in ["alpha", "beta", "gamma", "delta", "epsilon"] {
        db.chunks().create(library.id, None, text.into(), meta()).unwrap();
    }
    db.registry().build(library.id).unwrap();

    let results = db.chunks().search(library.id, "alpha", 3, None).unwrap();
    assert_eq!(results[0].0.text, "alpha");
}

#[test]
fn linear_library_filter_returns_only_matching_tag() {
    let db = VectorDbCore::new(DIM);
    let library = db
        .libraries()
        .create("docs".into(), IndexKind::Linear, DIM, meta(), meta())
        .unwrap();

    let tags = ["x", "y", "x", "z", "y"];
    for (i, tag) in tags.iter().enumerate() {
        let mut m = meta();
        m.insert("tag".into(), serde_json::json!(tag));
        db.chunks().create(library.id, None, format!("chunk{i}"), m).unwrap();
    }
    db.registry().build(library.id).unwrap();

    let mut filter: Filter = Filter::new();
    filter.insert("tag".into(), FieldFilter::Eq(serde_json::json!("x")));
    let results = db.chunks().search(library.id, "random", 5, Some(&filter)).unwrap();

    assert_eq!(results.len(), 2);
    for (chunk, _) in &results {
        assert_eq!(chunk.metadata.get("tag").and_then(|v| v.as_str()), Some("x"));
    }
}

#[test]
fn ivf_library_falls_back_to_pending_before_build_then_promotes_exact_match() {
    let db = VectorDbCore::new(DIM);
    let library = db
        .libraries()
        .create("docs".into(), IndexKind::Ivf, DIM, meta(), meta())
        .unwrap();

    for i in 0..10 {
        db.chunks().create(library.id, None, format!("t{i}"), meta()).unwrap();
    }

    let before_build = db.chunks().search(library.id, "t5", 3, None).unwrap();
    assert!(!before_build.is_empty() && before_build.len() <= 3);

    db.registry().build(library.id).unwrap();
    let after_build = db.chunks().search(library.id, "t5", 3, None).unwrap();
    assert_eq!(after_build[0].0.text, "t5");
}

#[test]
fn ivf_library_keeps_updated_chunk_retrievable_across_builds() {
    let db = VectorDbCore::new(DIM);
    let library = db
        .libraries()
        .create("docs".into(), IndexKind::Ivf, DIM, meta(), meta())
        .unwrap();

    let chunk = db.chunks().create(library.id, None, "original".into(), meta()).unwrap();
    db.registry().build(library.id).unwrap();

    db.chunks()
        .update(chunk.id, library.id, Some("updated".into()), None)
        .unwrap();

    let results = db.chunks().search(library.id, "updated", 1, None).unwrap();
    assert_eq!(results[0].0.id, chunk.id);

    db.registry().build(library.id).unwrap();
    let results = db.chunks().search(library.id, "updated", 1, None).unwrap();
    assert_eq!(results[0].0.id, chunk.id);
}

#[test]
fn nsw_library_finds_chunk_after_text_update() {
    let db = VectorDbCore::new(DIM);
    let library = db
        .libraries()
        .create("docs".into(), IndexKind::Nsw, DIM, meta(), meta())
        .unwrap();

    let mut chunks = Vec::new();
    for i in 0..5 {
        chunks.push(db.chunks().create(library.id, None, format!("chunk{i}"), meta()).unwrap());
    }
    let target = chunks[2].id;
    db.chunks().update(target, library.id, Some("new".into()), None).unwrap();

    let results = db.chunks().search(library.id, "new", 1, None).unwrap();
    assert_eq!(results[0].0.id, target);
}

#[test]
fn search_against_library_with_no_registered_index_is_an_index_error() {
    let db = VectorDbCore::new(DIM);
    let library = db
        .libraries()
        .create("docs".into(), IndexKind::Linear, DIM, meta(), meta())
        .unwrap();
    db.chunks().create(library.id, None, "hello".into(), meta()).unwrap();

    // Remove the index directly, bypassing the cascade, to reproduce a
    // library record whose index binding has gone missing.
    assert!(db.registry().delete(library.id));

    let err = db.chunks().search(library.id, "hello", 1, None);
    assert!(matches!(err, Err(CoreError::Index(_))));
}
