//! TriplesMap, SubjectMap and LogicalSource structures

use std::fmt;

use crate::term::RdfTerm;
use crate::vocab::FNO;

use super::{ObjectMap, PredicateObjectMap, TermMap};

/// Logical source: a source handle plus the way records are iterated from it
///
/// Two triples maps with equal logical sources consume the same record
/// stream, so the source is opened once and shared between them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogicalSource {
    /// Source identifier (file name, table name, ...)
    pub source: String,
    /// Reference formulation IRI (e.g. `ql:JSONPath`, `ql:CSV`)
    pub reference_formulation: Option<String>,
    /// Iterator expression selecting records within the source
    pub iterator: Option<String>,
}

impl LogicalSource {
    /// Create a logical source with no reference formulation or iterator
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            reference_formulation: None,
            iterator: None,
        }
    }

    /// Set the reference formulation
    pub fn with_reference_formulation(mut self, formulation: impl Into<String>) -> Self {
        self.reference_formulation = Some(formulation.into());
        self
    }

    /// Set the iterator expression
    pub fn with_iterator(mut self, iterator: impl Into<String>) -> Self {
        self.iterator = Some(iterator.into());
        self
    }
}

impl fmt::Display for LogicalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)?;
        if let Some(iterator) = &self.iterator {
            write!(f, " [{iterator}]")?;
        }
        Ok(())
    }
}

/// Subject map
///
/// Generates the subjects of a triples map, the `rdf:type` statements for
/// its classes, and the graphs those subjects' statements go to.
#[derive(Debug, Clone)]
pub struct SubjectMap {
    /// Term map producing subjects
    pub term_map: TermMap,
    /// Class IRIs asserted with `rdf:type` for every subject
    pub classes: Vec<String>,
    /// Graph maps
    pub graph_maps: Vec<TermMap>,
}

impl SubjectMap {
    /// Create a subject map from any term map
    pub fn new(term_map: TermMap) -> Self {
        Self {
            term_map,
            classes: Vec::new(),
            graph_maps: Vec::new(),
        }
    }

    /// Create a template subject map
    pub fn template(template: impl Into<String>) -> Self {
        Self::new(TermMap::template(template))
    }

    /// Create a constant subject map
    pub fn constant(iri: impl Into<String>) -> Self {
        Self::new(TermMap::constant_iri(iri))
    }

    /// Create a reference subject map
    pub fn reference(reference: impl Into<String>) -> Self {
        Self::new(TermMap::reference(reference))
    }

    /// Add a class
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    /// Add a graph map
    pub fn with_graph_map(mut self, graph_map: TermMap) -> Self {
        self.graph_maps.push(graph_map);
        self
    }
}

/// TriplesMap
///
/// One mapping rule: a logical source plus the subject and predicate-object
/// maps applied to each of its records.
#[derive(Debug, Clone)]
pub struct TriplesMap {
    /// TriplesMap identity (IRI or blank node label)
    pub id: String,
    /// Where records come from
    pub logical_source: LogicalSource,
    /// Subject maps (at least one is required)
    pub subject_maps: Vec<SubjectMap>,
    /// Predicate-object maps
    pub predicate_object_maps: Vec<PredicateObjectMap>,
}

impl TriplesMap {
    /// Create a TriplesMap with no subject or predicate-object maps
    pub fn new(id: impl Into<String>, logical_source: LogicalSource) -> Self {
        Self {
            id: id.into(),
            logical_source,
            subject_maps: Vec::new(),
            predicate_object_maps: Vec::new(),
        }
    }

    /// Add a subject map
    pub fn with_subject_map(mut self, subject_map: SubjectMap) -> Self {
        self.subject_maps.push(subject_map);
        self
    }

    /// Add a predicate-object map
    pub fn with_predicate_object_map(mut self, pom: PredicateObjectMap) -> Self {
        self.predicate_object_maps.push(pom);
        self
    }

    /// Build the nested triples map of a function-value term map
    ///
    /// The execution is a blank node that `fno:executes` the function, with
    /// one predicate-object map per parameter binding.
    pub fn function_execution(
        function_iri: impl Into<String>,
        parameters: impl IntoIterator<Item = (String, TermMap)>,
    ) -> Self {
        let mut tm = TriplesMap::new("[function execution]", LogicalSource::new(""))
            .with_subject_map(SubjectMap::new(TermMap::constant(RdfTerm::blank_node(
                "execution",
            ))))
            .with_predicate_object_map(PredicateObjectMap::new(
                FNO::EXECUTES,
                TermMap::constant_iri(function_iri),
            ));
        for (parameter, value) in parameters {
            tm = tm.with_predicate_object_map(PredicateObjectMap::new(parameter, value));
        }
        tm
    }

    /// Check whether any predicate-object map references another TriplesMap
    pub fn has_ref_object_maps(&self) -> bool {
        self.predicate_object_maps
            .iter()
            .flat_map(|pom| pom.object_maps.iter())
            .any(ObjectMap::is_ref)
    }
}
