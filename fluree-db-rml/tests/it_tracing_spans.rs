//! Span coverage for a mapping run.
//!
//! Runs on a `current_thread` runtime so every task reports to the
//! thread-local capture subscriber.

mod support;

use fluree_db_rml::{
    InMemoryRecordSource, LogicalSource, PredicateObjectMap, RefObjectMap, SubjectMap, TermMap,
    TriplesMap,
};
use serde_json::json;
use support::span_capture::init_test_tracing;
use support::{ex, mapper, run};

fn joined_mapping() -> Vec<TriplesMap> {
    let country = TriplesMap::new("<#Country>", LogicalSource::new("countries"))
        .with_subject_map(SubjectMap::template("http://ex/{id}"))
        .with_predicate_object_map(PredicateObjectMap::new(ex("code"), TermMap::reference("code")));
    let city = TriplesMap::new("<#City>", LogicalSource::new("cities"))
        .with_subject_map(SubjectMap::template("http://ex/{name}"))
        .with_predicate_object_map(PredicateObjectMap::new(
            ex("country"),
            RefObjectMap::new("<#Country>", "cc", "code"),
        ));
    vec![city, country]
}

fn source() -> InMemoryRecordSource {
    InMemoryRecordSource::new()
        .with_records("countries", vec![json!({"id": "BE", "code": "BE"})])
        .with_records("cities", vec![json!({"name": "Ghent", "cc": "BE"})])
}

#[tokio::test(flavor = "current_thread")]
async fn run_emits_source_and_triples_map_spans() {
    let (store, _guard) = init_test_tracing();

    let statements = run(&mapper(joined_mapping()), source()).await.unwrap();
    assert_eq!(statements.len(), 2);

    assert_eq!(
        store.field_values("rml_source", "source"),
        vec!["cities", "countries"]
    );
    assert_eq!(
        store.field_values("rml_triples_map", "triples_map"),
        vec!["<#City>", "<#Country>"]
    );
    for span in store.find_spans("rml_triples_map") {
        assert_eq!(span.level, tracing::Level::DEBUG);
    }
}

#[tokio::test(flavor = "current_thread")]
async fn join_resolution_has_its_own_span() {
    let (store, _guard) = init_test_tracing();

    run(&mapper(joined_mapping()), source()).await.unwrap();

    let spans = store.find_spans("rml_resolve_join");
    assert_eq!(spans.len(), 1);
    assert_eq!(
        spans[0].fields.get("key").map(String::as_str),
        Some("<#City>/pom[0]/object[0]")
    );
    assert_eq!(
        spans[0].fields.get("parent").map(String::as_str),
        Some("<#Country>")
    );
}

#[tokio::test(flavor = "current_thread")]
async fn joinless_runs_skip_resolution_spans() {
    let (store, _guard) = init_test_tracing();
    let tm = TriplesMap::new("<#Country>", LogicalSource::new("countries"))
        .with_subject_map(SubjectMap::template("http://ex/{id}"));

    run(&mapper(vec![tm]), source()).await.unwrap();

    assert!(store.has_span("rml_source"));
    assert!(!store.has_span("rml_resolve_join"));
}
