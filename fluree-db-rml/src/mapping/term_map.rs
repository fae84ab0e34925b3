//! Term map structures
//!
//! Term maps define how RDF terms are generated from record data. A term map
//! is the rule graph's raw form: its expression slots are all optional, and
//! the term generator checks at build time that exactly one is set.

use std::sync::Arc;

use crate::term::RdfTerm;
use crate::vocab::{R2RML, RML};

use super::{RefObjectMap, TriplesMap};

/// Term type
///
/// Specifies whether a term map generates IRIs, blank nodes, or literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TermType {
    /// Generate an IRI
    Iri,
    /// Generate a blank node
    BlankNode,
    /// Generate a literal
    Literal,
}

impl TermType {
    /// Parse term type from an R2RML or RML IRI
    pub fn from_iri(iri: &str) -> Option<Self> {
        match iri {
            R2RML::IRI | RML::IRI => Some(TermType::Iri),
            R2RML::BLANK_NODE | RML::BLANK_NODE => Some(TermType::BlankNode),
            R2RML::LITERAL | RML::LITERAL => Some(TermType::Literal),
            _ => None,
        }
    }

    /// Term type of an already generated term
    pub fn of(term: &RdfTerm) -> Self {
        match term {
            RdfTerm::Iri(_) => TermType::Iri,
            RdfTerm::BlankNode(_) => TermType::BlankNode,
            RdfTerm::Literal { .. } => TermType::Literal,
        }
    }
}

/// Term map
///
/// Exactly one of `constant`, `reference`, `template` and `function_value`
/// must be set.
#[derive(Debug, Clone, Default)]
pub struct TermMap {
    /// Rule identity used in error messages (IRI or blank node label)
    pub id: Option<String>,
    /// `rml:constant` - fixed term
    pub constant: Option<RdfTerm>,
    /// `rml:reference` - reference expression evaluated per record
    pub reference: Option<String>,
    /// `rml:template` - string with `{reference}` placeholders
    pub template: Option<String>,
    /// `fnml:functionValue` - nested triples map describing a function call
    pub function_value: Option<Arc<TriplesMap>>,
    /// Declared `rml:termType`; position defaults apply when absent
    pub term_type: Option<TermType>,
    /// `rml:datatypeMap` (a constant `rr:datatype` is a constant datatype map)
    pub datatype_map: Option<Box<TermMap>>,
    /// `rml:languageMap` (a constant `rr:language` is a constant language map)
    pub language_map: Option<Box<TermMap>>,
}

impl TermMap {
    /// Create a constant term map
    pub fn constant(term: RdfTerm) -> Self {
        Self {
            constant: Some(term),
            ..Self::default()
        }
    }

    /// Create a constant IRI term map
    pub fn constant_iri(iri: impl Into<String>) -> Self {
        Self::constant(RdfTerm::iri(iri))
    }

    /// Create a constant plain literal term map
    pub fn constant_literal(value: impl Into<String>) -> Self {
        Self::constant(RdfTerm::string(value))
    }

    /// Create a reference-valued term map
    pub fn reference(reference: impl Into<String>) -> Self {
        Self {
            reference: Some(reference.into()),
            ..Self::default()
        }
    }

    /// Create a template-valued term map
    pub fn template(template: impl Into<String>) -> Self {
        Self {
            template: Some(template.into()),
            ..Self::default()
        }
    }

    /// Create a function-valued term map
    pub fn function_value(function: TriplesMap) -> Self {
        Self {
            function_value: Some(Arc::new(function)),
            ..Self::default()
        }
    }

    /// Set the rule identity
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the term type
    pub fn with_term_type(mut self, term_type: TermType) -> Self {
        self.term_type = Some(term_type);
        self
    }

    /// Set a constant datatype (`rr:datatype`)
    pub fn with_datatype(self, datatype: impl Into<String>) -> Self {
        self.with_datatype_map(TermMap::constant_iri(datatype))
    }

    /// Set a datatype map
    pub fn with_datatype_map(mut self, datatype_map: TermMap) -> Self {
        self.datatype_map = Some(Box::new(datatype_map));
        self
    }

    /// Set a constant language tag (`rr:language`)
    pub fn with_language(self, language: impl Into<String>) -> Self {
        self.with_language_map(TermMap::constant_literal(language))
    }

    /// Set a language map
    pub fn with_language_map(mut self, language_map: TermMap) -> Self {
        self.language_map = Some(Box::new(language_map));
        self
    }

    /// Number of expression slots that are set
    pub fn expression_count(&self) -> usize {
        [
            self.constant.is_some(),
            self.reference.is_some(),
            self.template.is_some(),
            self.function_value.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }

    /// Rule identity, or a description of the term map when it has none
    pub fn rule_id(&self) -> String {
        if let Some(id) = &self.id {
            return id.clone();
        }
        if let Some(constant) = &self.constant {
            return format!("[constant {constant}]");
        }
        if let Some(reference) = &self.reference {
            return format!("[reference {reference:?}]");
        }
        if let Some(template) = &self.template {
            return format!("[template {template:?}]");
        }
        if let Some(function) = &self.function_value {
            return format!("[functionValue {}]", function.id);
        }
        "[empty term map]".to_string()
    }
}

/// Object map
///
/// Either a plain term map or a reference to another triples map's subjects.
#[derive(Debug, Clone)]
pub enum ObjectMap {
    /// A term map in object position
    Term(TermMap),
    /// `rml:parentTriplesMap` - reference to another TriplesMap (join)
    RefObjectMap(RefObjectMap),
}

impl ObjectMap {
    /// Check if this is a reference object map
    pub fn is_ref(&self) -> bool {
        matches!(self, ObjectMap::RefObjectMap(_))
    }

    /// Get the RefObjectMap if this is a reference
    pub fn as_ref(&self) -> Option<&RefObjectMap> {
        match self {
            ObjectMap::RefObjectMap(ref_map) => Some(ref_map),
            _ => None,
        }
    }
}

impl From<TermMap> for ObjectMap {
    fn from(term_map: TermMap) -> Self {
        ObjectMap::Term(term_map)
    }
}

impl From<RefObjectMap> for ObjectMap {
    fn from(ref_object_map: RefObjectMap) -> Self {
        ObjectMap::RefObjectMap(ref_object_map)
    }
}

/// Predicate-object map
///
/// Every generated predicate is combined with every generated object, in the
/// union of the subject's graphs and this map's graphs.
#[derive(Debug, Clone, Default)]
pub struct PredicateObjectMap {
    /// Predicate maps
    pub predicate_maps: Vec<TermMap>,
    /// Object maps (plain or ref-object)
    pub object_maps: Vec<ObjectMap>,
    /// Graph maps local to this group
    pub graph_maps: Vec<TermMap>,
}

impl PredicateObjectMap {
    /// Create a predicate-object map with one constant predicate and one object map
    pub fn new(predicate_iri: impl Into<String>, object_map: impl Into<ObjectMap>) -> Self {
        Self {
            predicate_maps: vec![TermMap::constant_iri(predicate_iri)],
            object_maps: vec![object_map.into()],
            graph_maps: Vec::new(),
        }
    }

    /// Add a predicate map
    pub fn with_predicate_map(mut self, predicate_map: TermMap) -> Self {
        self.predicate_maps.push(predicate_map);
        self
    }

    /// Add an object map
    pub fn with_object_map(mut self, object_map: impl Into<ObjectMap>) -> Self {
        self.object_maps.push(object_map.into());
        self
    }

    /// Add a graph map
    pub fn with_graph_map(mut self, graph_map: TermMap) -> Self {
        self.graph_maps.push(graph_map);
        self
    }

    /// Iterate the ref-object maps of this group
    pub fn ref_object_maps(&self) -> impl Iterator<Item = &RefObjectMap> {
        self.object_maps.iter().filter_map(ObjectMap::as_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_type_from_iri() {
        assert_eq!(
            TermType::from_iri("http://www.w3.org/ns/r2rml#IRI"),
            Some(TermType::Iri)
        );
        assert_eq!(
            TermType::from_iri("http://w3id.org/rml/BlankNode"),
            Some(TermType::BlankNode)
        );
        assert_eq!(
            TermType::from_iri("http://www.w3.org/ns/r2rml#Literal"),
            Some(TermType::Literal)
        );
        assert_eq!(TermType::from_iri("invalid"), None);
    }

    #[test]
    fn test_expression_count() {
        assert_eq!(TermMap::reference("name").expression_count(), 1);
        assert_eq!(TermMap::default().expression_count(), 0);

        let mut both = TermMap::template("http://ex/{id}");
        both.reference = Some("id".to_string());
        assert_eq!(both.expression_count(), 2);
    }

    #[test]
    fn test_literal_modifiers() {
        let tm = TermMap::reference("label").with_language("en");
        let lang = tm.language_map.as_ref().unwrap();
        assert_eq!(lang.constant, Some(RdfTerm::string("en")));
        assert!(tm.datatype_map.is_none());
    }

    #[test]
    fn test_rule_id_prefers_explicit_id() {
        assert_eq!(TermMap::reference("x").with_id("<#Om>").rule_id(), "<#Om>");
        assert_eq!(TermMap::reference("x").rule_id(), "[reference \"x\"]");
    }

    #[test]
    fn test_predicate_object_map_refs() {
        let pom = PredicateObjectMap::new("http://ex/name", TermMap::reference("name"))
            .with_object_map(RefObjectMap::new("<#Parent>", "pid", "id"));
        assert_eq!(pom.ref_object_maps().count(), 1);
        assert!(!pom.object_maps[0].is_ref());
    }
}
