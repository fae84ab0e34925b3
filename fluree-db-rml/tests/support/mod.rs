//! Shared helpers for fluree-db-rml integration tests.

// Not every integration test crate uses every helper.
#![allow(dead_code)]

pub mod span_capture;

use std::sync::Arc;

use fluree_db_rml::{
    FunctionRegistry, InMemoryRecordSource, MappingGraph, RdfTerm, RecordSource, RmlConfig,
    RmlMapper, RmlResult, Statement, TriplesMap,
};

pub const EX: &str = "http://ex/";

/// IRI in the `http://ex/` namespace
pub fn ex(local: &str) -> String {
    format!("{EX}{local}")
}

pub fn iri(local: &str) -> RdfTerm {
    RdfTerm::iri(ex(local))
}

/// Build a mapper with default configuration
pub fn mapper(triples_maps: Vec<TriplesMap>) -> RmlMapper {
    mapper_with(triples_maps, RmlConfig::default(), FunctionRegistry::new())
}

pub fn mapper_with(
    triples_maps: Vec<TriplesMap>,
    config: RmlConfig,
    functions: FunctionRegistry,
) -> RmlMapper {
    RmlMapper::new(MappingGraph::new(triples_maps), config, functions).expect("valid mapping")
}

/// Run a mapping to completion
pub async fn run(mapper: &RmlMapper, source: InMemoryRecordSource) -> RmlResult<Vec<Statement>> {
    let source: Arc<dyn RecordSource> = Arc::new(source);
    mapper.map(source).collect_statements().await
}

/// Statements as sorted N-Quads lines, for order-independent comparison
pub fn nquads(statements: &[Statement]) -> Vec<String> {
    let mut lines: Vec<String> = statements.iter().map(ToString::to_string).collect();
    lines.sort();
    lines
}
