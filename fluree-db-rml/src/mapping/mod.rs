//! Mapping rule graph structures
//!
//! This module provides the in-memory form of a mapping document: triples
//! maps, their subject / predicate-object / ref-object maps, and the term
//! maps inside them. Parsing a document into these structures happens
//! elsewhere; the mappers in [`crate::mapper`] consume them read-only.

mod graph;
mod ref_object_map;
mod term_map;
mod triples_map;

pub use graph::MappingGraph;
pub use ref_object_map::{JoinCondition, RefObjectMap};
pub use term_map::{ObjectMap, PredicateObjectMap, TermMap, TermType};
pub use triples_map::{LogicalSource, SubjectMap, TriplesMap};
