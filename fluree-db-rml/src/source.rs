//! Record source capabilities
//!
//! These traits define the interface between the mapping engine and the
//! format-specific backends (CSV, JSON, XML, SQL, ...). The engine never looks
//! inside a record; it only asks a record to evaluate reference expressions,
//! and asks the source for datatype hints derived from its native schema.
//!
//! [`InMemoryRecordSource`] is a small JSON-backed implementation for tests
//! and for callers that already hold their records in memory.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::Value;

use crate::error::{RmlError, RmlResult};
use crate::mapping::LogicalSource;

/// Evaluates reference expressions against one record
pub trait ExpressionEvaluation: Send + Sync {
    /// Evaluate a reference expression
    ///
    /// Returns zero, one or many raw values. `null` entries and nested arrays
    /// are allowed; the engine skips nulls and flattens arrays.
    fn evaluate(&self, expression: &str) -> RmlResult<Vec<Value>>;
}

/// Provides datatype hints from a source's native schema (e.g. SQL column types)
pub trait DatatypeLookup: Send + Sync {
    /// Datatype IRI inferred for values of the given reference, if any
    fn datatype(&self, expression: &str) -> Option<String>;
}

/// Datatype lookup for sources without schema information
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDatatypeLookup;

impl DatatypeLookup for NoDatatypeLookup {
    fn datatype(&self, _expression: &str) -> Option<String> {
        None
    }
}

impl DatatypeLookup for HashMap<String, String> {
    fn datatype(&self, expression: &str) -> Option<String> {
        self.get(expression).cloned()
    }
}

/// A record as seen by the engine
pub type Record = Arc<dyn ExpressionEvaluation>;

/// Stream of records read from one logical source
pub type RecordStream = BoxStream<'static, RmlResult<Record>>;

/// Produces record streams for logical sources
///
/// Each logical source is opened once per mapping run, however many triples
/// maps consume it.
#[async_trait]
pub trait RecordSource: Debug + Send + Sync {
    /// Open the record stream of a logical source
    async fn open(&self, logical_source: &LogicalSource) -> RmlResult<RecordStream>;

    /// Datatype hints for references of a logical source
    fn datatype_lookup(&self, _logical_source: &LogicalSource) -> Arc<dyn DatatypeLookup> {
        Arc::new(NoDatatypeLookup)
    }
}

/// Convert raw values to lexical forms
///
/// Nulls are dropped, arrays are flattened, strings are used verbatim and
/// every other JSON value uses its serialized form.
pub fn lexical_values(values: Vec<Value>) -> Vec<String> {
    let mut out = Vec::with_capacity(values.len());
    for value in values {
        push_lexical(value, &mut out);
    }
    out
}

fn push_lexical(value: Value, out: &mut Vec<String>) {
    match value {
        Value::Null => {}
        Value::String(s) => out.push(s),
        Value::Bool(b) => out.push(b.to_string()),
        Value::Number(n) => out.push(n.to_string()),
        Value::Array(items) => {
            for item in items {
                push_lexical(item, out);
            }
        }
        obj @ Value::Object(_) => out.push(obj.to_string()),
    }
}

/// A JSON value as a record
///
/// References are dotted paths (`address.city`); arrays met along the path
/// fan out, so `tags` on `{"tags": ["a", "b"]}` yields two values.
#[derive(Debug, Clone)]
pub struct JsonRecord(Value);

impl JsonRecord {
    /// Wrap a JSON value
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// The wrapped value
    pub fn value(&self) -> &Value {
        &self.0
    }
}

impl ExpressionEvaluation for JsonRecord {
    fn evaluate(&self, expression: &str) -> RmlResult<Vec<Value>> {
        Ok(select_path(&self.0, expression)
            .into_iter()
            .cloned()
            .collect())
    }
}

fn select_path<'a>(root: &'a Value, path: &str) -> Vec<&'a Value> {
    let mut current = vec![root];
    for segment in path.split('.').filter(|s| !s.is_empty()) {
        let mut next = Vec::new();
        for value in current {
            collect_field(value, segment, &mut next);
        }
        current = next;
    }
    current
}

fn collect_field<'a>(value: &'a Value, field: &str, out: &mut Vec<&'a Value>) {
    match value {
        Value::Object(map) => {
            if let Some(v) = map.get(field) {
                out.push(v);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_field(item, field, out);
            }
        }
        _ => {}
    }
}

/// In-memory JSON record source
///
/// Documents are registered per source name. When a logical source declares
/// an iterator, it is evaluated as a dotted path against every document and
/// each match (array elements individually) becomes a record; otherwise each
/// document is one record.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecordSource {
    documents: HashMap<String, Vec<Value>>,
    datatypes: HashMap<String, HashMap<String, String>>,
    failures: HashMap<String, String>,
}

impl InMemoryRecordSource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the documents of a source
    pub fn with_records(mut self, source: impl Into<String>, records: Vec<Value>) -> Self {
        self.documents
            .entry(source.into())
            .or_default()
            .extend(records);
        self
    }

    /// Register a datatype hint for a reference of a source
    pub fn with_datatype(
        mut self,
        source: impl Into<String>,
        reference: impl Into<String>,
        datatype: impl Into<String>,
    ) -> Self {
        self.datatypes
            .entry(source.into())
            .or_default()
            .insert(reference.into(), datatype.into());
        self
    }

    /// Make the stream of a source fail after its registered records
    pub fn with_failure(mut self, source: impl Into<String>, message: impl Into<String>) -> Self {
        self.failures.insert(source.into(), message.into());
        self
    }

    fn records_for(&self, logical_source: &LogicalSource) -> Option<Vec<Value>> {
        let documents = self.documents.get(&logical_source.source)?;
        let records = match &logical_source.iterator {
            None => documents.clone(),
            Some(iterator) => documents
                .iter()
                .flat_map(|doc| select_path(doc, iterator))
                .flat_map(|v| match v {
                    Value::Array(items) => items.clone(),
                    other => vec![other.clone()],
                })
                .collect(),
        };
        Some(records)
    }
}

#[async_trait]
impl RecordSource for InMemoryRecordSource {
    async fn open(&self, logical_source: &LogicalSource) -> RmlResult<RecordStream> {
        let failure = self.failures.get(&logical_source.source).cloned();
        let records = match self.records_for(logical_source) {
            Some(records) => records,
            None if failure.is_some() => Vec::new(),
            None => {
                return Err(RmlError::Source {
                    source_name: logical_source.source.clone(),
                    message: "no records registered".to_string(),
                })
            }
        };

        let source_name = logical_source.source.clone();
        let records = stream::iter(
            records
                .into_iter()
                .map(|value| Ok(Arc::new(JsonRecord::new(value)) as Record)),
        );
        let failure = stream::iter(failure.map(|message| {
            Err(RmlError::Source {
                source_name,
                message,
            })
        }));
        Ok(records.chain(failure).boxed())
    }

    fn datatype_lookup(&self, logical_source: &LogicalSource) -> Arc<dyn DatatypeLookup> {
        match self.datatypes.get(&logical_source.source) {
            Some(types) => Arc::new(types.clone()),
            None => Arc::new(NoDatatypeLookup),
        }
    }
}
