//! Streaming RML mapping engine for Fluree DB graph sources
//!
//! This crate executes RML (and R2RML) mapping rules over streams of
//! heterogeneous records (JSON, CSV, SQL rows, ...) and produces RDF
//! statements. Record formats stay behind the [`RecordSource`] and
//! [`ExpressionEvaluation`] capabilities; the engine only deals in reference
//! expressions and raw JSON values.
//!
//! # Key Features
//!
//! - **Term generation**: constants, references, templates (IRI-safe
//!   encoding, multi-valued substitution) and function-valued term maps
//! - **Streaming joins**: ref-object maps between independently streamed
//!   logical sources, resolved once both sides are exhausted
//! - **Shared sources**: each logical source is read once per run, however
//!   many triples maps consume it
//! - **Bounded memory**: parent-side join indexes are released as soon as the
//!   last dependent ref-object map has resolved
//!
//! # Usage
//!
//! Build a [`MappingGraph`] from [`TriplesMap`] definitions, create an
//! [`RmlMapper`] (this validates every rule), then call
//! [`RmlMapper::map`] with a [`RecordSource`] to obtain a [`MappingStream`]
//! of statements.

pub mod config;
pub mod error;
pub mod function;
pub mod generate;
pub mod mapper;
pub mod mapping;
pub mod pipeline;
pub mod source;
pub mod term;
pub mod vocab;

pub use config::RmlConfig;
pub use error::{RmlError, RmlResult};
pub use function::{FunctionExecution, FunctionRegistry, RmlFunction};
pub use generate::{TermGenerator, TermPosition};
pub use mapper::TriplesMapper;
pub use mapping::{
    JoinCondition, LogicalSource, MappingGraph, ObjectMap, PredicateObjectMap, RefObjectMap,
    SubjectMap, TermMap, TermType, TriplesMap,
};
pub use pipeline::{MappedStatement, MappingStream, RmlMapper};
pub use source::{
    DatatypeLookup, ExpressionEvaluation, InMemoryRecordSource, JsonRecord, NoDatatypeLookup,
    Record, RecordSource, RecordStream,
};
pub use term::{RdfTerm, Statement};
pub use vocab::{FNO, R2RML, RML};
