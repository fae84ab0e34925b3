//! Joins between triples maps over independently streamed sources.

mod support;

use std::sync::Arc;

use fluree_db_rml::{
    FunctionRegistry, InMemoryRecordSource, JoinCondition, LogicalSource, PredicateObjectMap,
    RdfTerm, RefObjectMap, RmlConfig, Statement, SubjectMap, TermMap, TriplesMap,
};
use serde_json::json;
use support::{ex, iri, mapper, mapper_with, nquads, run};

fn country_map() -> TriplesMap {
    TriplesMap::new("<#Country>", LogicalSource::new("countries"))
        .with_subject_map(SubjectMap::template("http://ex/{id}"))
        .with_predicate_object_map(PredicateObjectMap::new(ex("code"), TermMap::reference("code")))
}

fn city_map() -> TriplesMap {
    TriplesMap::new("<#City>", LogicalSource::new("cities"))
        .with_subject_map(SubjectMap::template("http://ex/{name}"))
        .with_predicate_object_map(PredicateObjectMap::new(
            ex("country"),
            RefObjectMap::new("<#Country>", "cc", "code"),
        ))
}

fn objects_of(statements: &[Statement], subject: &RdfTerm, predicate: &str) -> Vec<RdfTerm> {
    let mut objects: Vec<_> = statements
        .iter()
        .filter(|s| &s.subject == subject && s.predicate == RdfTerm::iri(ex(predicate)))
        .map(|s| s.object.clone())
        .collect();
    objects.sort();
    objects
}

#[tokio::test]
async fn duplicate_parent_values_match_every_parent() {
    let source = InMemoryRecordSource::new()
        .with_records(
            "countries",
            vec![
                json!({"id": "P1", "code": "BE"}),
                json!({"id": "P2", "code": "BE"}),
            ],
        )
        .with_records("cities", vec![json!({"name": "Ghent", "cc": "BE"})]);

    let statements = run(&mapper(vec![city_map(), country_map()]), source)
        .await
        .unwrap();

    assert_eq!(
        objects_of(&statements, &iri("Ghent"), "country"),
        vec![iri("P1"), iri("P2")]
    );
}

#[tokio::test]
async fn join_conditions_intersect() {
    let parent = TriplesMap::new("<#Parent>", LogicalSource::new("parents"))
        .with_subject_map(SubjectMap::template("http://ex/{id}"));
    let child = TriplesMap::new("<#Child>", LogicalSource::new("children"))
        .with_subject_map(SubjectMap::template("http://ex/{id}"))
        .with_predicate_object_map(PredicateObjectMap::new(
            ex("matches"),
            RefObjectMap::with_conditions(
                "<#Parent>",
                vec![JoinCondition::new("a", "x"), JoinCondition::new("b", "y")],
            ),
        ));
    let source = InMemoryRecordSource::new()
        .with_records(
            "parents",
            vec![
                json!({"id": "P1", "x": "a", "y": "q"}),
                json!({"id": "P2", "x": "a", "y": "b"}),
                json!({"id": "P3", "x": "z", "y": "b"}),
            ],
        )
        .with_records("children", vec![json!({"id": "C", "a": "a", "b": "b"})]);

    let statements = run(&mapper(vec![child, parent]), source).await.unwrap();

    assert_eq!(statements, vec![Statement::triple(iri("C"), iri("matches"), iri("P2"))]);
}

#[tokio::test]
async fn unmatched_children_are_not_errors() {
    let source = InMemoryRecordSource::new()
        .with_records("countries", vec![json!({"id": "BE", "code": "BE"})])
        .with_records(
            "cities",
            vec![
                json!({"name": "Paris", "cc": "FR"}),
                json!({"name": "Nowhere"}),
            ],
        );

    let statements = run(&mapper(vec![city_map(), country_map()]), source)
        .await
        .unwrap();

    assert_eq!(
        nquads(&statements),
        vec!["<http://ex/BE> <http://ex/code> \"BE\" ."]
    );
}

#[tokio::test]
async fn joined_statements_follow_child_graphs() {
    let city = TriplesMap::new("<#City>", LogicalSource::new("cities"))
        .with_subject_map(
            SubjectMap::template("http://ex/{name}")
                .with_graph_map(TermMap::constant_iri(ex("geo"))),
        )
        .with_predicate_object_map(PredicateObjectMap::new(
            ex("country"),
            RefObjectMap::new("<#Country>", "cc", "code"),
        ));
    let source = InMemoryRecordSource::new()
        .with_records("countries", vec![json!({"id": "BE", "code": "BE"})])
        .with_records("cities", vec![json!({"name": "Ghent", "cc": "BE"})]);

    let statements = run(&mapper(vec![city, country_map()]), source).await.unwrap();

    assert!(statements.contains(&Statement::new(
        iri("Ghent"),
        iri("country"),
        iri("BE"),
        Some(iri("geo")),
    )));
}

#[tokio::test]
async fn one_parent_many_children() {
    let capital = TriplesMap::new("<#Capital>", LogicalSource::new("capitals"))
        .with_subject_map(SubjectMap::template("http://ex/{name}"))
        .with_predicate_object_map(PredicateObjectMap::new(
            ex("capitalOf"),
            RefObjectMap::new("<#Country>", "of", "code"),
        ));
    let source = InMemoryRecordSource::new()
        .with_records(
            "countries",
            vec![
                json!({"id": "BE", "code": "BE"}),
                json!({"id": "NL", "code": "NL"}),
            ],
        )
        .with_records(
            "cities",
            vec![
                json!({"name": "Ghent", "cc": "BE"}),
                json!({"name": "Utrecht", "cc": "NL"}),
            ],
        )
        .with_records("capitals", vec![json!({"name": "Brussels", "of": "BE"})]);

    let statements = run(&mapper(vec![city_map(), capital, country_map()]), source)
        .await
        .unwrap();

    assert_eq!(objects_of(&statements, &iri("Ghent"), "country"), vec![iri("BE")]);
    assert_eq!(objects_of(&statements, &iri("Utrecht"), "country"), vec![iri("NL")]);
    assert_eq!(objects_of(&statements, &iri("Brussels"), "capitalOf"), vec![iri("BE")]);
}

#[tokio::test]
async fn self_join_within_one_source() {
    let employee = TriplesMap::new("<#Employee>", LogicalSource::new("staff"))
        .with_subject_map(SubjectMap::template("http://ex/e{id}"))
        .with_predicate_object_map(PredicateObjectMap::new(
            ex("manager"),
            RefObjectMap::new("<#Employee>", "manager", "id"),
        ));
    let source = InMemoryRecordSource::new().with_records(
        "staff",
        vec![
            json!({"id": "1"}),
            json!({"id": "2", "manager": "1"}),
            json!({"id": "3", "manager": "2"}),
        ],
    );

    let statements = run(&mapper(vec![employee]), source).await.unwrap();

    assert_eq!(
        nquads(&statements),
        vec![
            "<http://ex/e2> <http://ex/manager> <http://ex/e1> .",
            "<http://ex/e3> <http://ex/manager> <http://ex/e2> .",
        ]
    );
}

#[tokio::test]
async fn reference_without_conditions_on_shared_source() {
    let address = TriplesMap::new("<#Address>", LogicalSource::new("people"))
        .with_subject_map(SubjectMap::template("http://ex/address/{id}"));
    let person = TriplesMap::new("<#Person>", LogicalSource::new("people"))
        .with_subject_map(SubjectMap::template("http://ex/{id}"))
        .with_predicate_object_map(PredicateObjectMap::new(
            ex("address"),
            RefObjectMap::unconditional("<#Address>"),
        ));
    let source = InMemoryRecordSource::new()
        .with_records("people", vec![json!({"id": "1"}), json!({"id": "2"})]);

    let statements = run(&mapper(vec![person, address]), source).await.unwrap();

    assert_eq!(
        nquads(&statements),
        vec![
            "<http://ex/1> <http://ex/address> <http://ex/address/1> .",
            "<http://ex/2> <http://ex/address> <http://ex/address/2> .",
        ]
    );
}

#[tokio::test]
async fn selected_triples_maps_still_join_against_parents() {
    let source = InMemoryRecordSource::new()
        .with_records("countries", vec![json!({"id": "BE", "code": "BE"})])
        .with_records("cities", vec![json!({"name": "Ghent", "cc": "BE"})]);
    let mapper = mapper(vec![city_map(), country_map()]);

    let statements = mapper
        .map_triples_maps(Arc::new(source), &["<#City>"])
        .collect_statements()
        .await
        .unwrap();

    assert_eq!(
        statements,
        vec![Statement::triple(iri("Ghent"), iri("country"), iri("BE"))]
    );
}

#[tokio::test]
async fn repeated_runs_do_not_share_join_state() {
    let mapper = mapper(vec![city_map(), country_map()]);
    let make_source = || {
        InMemoryRecordSource::new()
            .with_records("countries", vec![json!({"id": "BE", "code": "BE"})])
            .with_records("cities", vec![json!({"name": "Ghent", "cc": "BE"})])
    };

    let first = run(&mapper, make_source()).await.unwrap();
    let second = run(&mapper, make_source()).await.unwrap();

    assert_eq!(nquads(&first), nquads(&second));
    assert_eq!(objects_of(&second, &iri("Ghent"), "country"), vec![iri("BE")]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn shared_join_values_across_worker_threads() {
    // 200 countries over 10 codes, 200 cities over the same codes:
    // every city matches the 20 countries sharing its code.
    let countries: Vec<_> = (0..200)
        .map(|i| json!({"id": format!("P{i}"), "code": format!("C{}", i % 10)}))
        .collect();
    let cities: Vec<_> = (0..200)
        .map(|i| json!({"name": format!("T{i}"), "cc": format!("C{}", i % 10)}))
        .collect();
    let mapper = mapper_with(
        vec![city_map(), country_map()],
        RmlConfig::default().with_channel_capacity(2),
        FunctionRegistry::new(),
    );

    for _ in 0..5 {
        let source = InMemoryRecordSource::new()
            .with_records("countries", countries.clone())
            .with_records("cities", cities.clone());
        let statements = run(&mapper, source).await.unwrap();

        let joined = statements
            .iter()
            .filter(|s| s.predicate == iri("country"))
            .count();
        assert_eq!(joined, 200 * 20);
        assert_eq!(statements.len(), 200 * 20 + 200);
        assert_eq!(objects_of(&statements, &iri("T7"), "country").len(), 20);
    }
}
