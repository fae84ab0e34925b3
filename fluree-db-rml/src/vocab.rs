//! Vocabulary constants used by the mapping engine
//!
//! Covers the R2RML and RML namespaces (term types, the default graph marker),
//! the Function Ontology terms used by function-value term maps, and the few
//! RDF / XSD IRIs the engine generates itself.
//!
//! # Usage
//!
//! ```
//! use fluree_db_rml::vocab::R2RML;
//!
//! let iri = "http://www.w3.org/ns/r2rml#defaultGraph";
//! assert_eq!(iri, R2RML::DEFAULT_GRAPH);
//! ```

/// R2RML vocabulary
pub struct R2RML;

impl R2RML {
    /// R2RML namespace IRI
    pub const NS: &'static str = "http://www.w3.org/ns/r2rml#";

    /// rr:IRI - term type for IRIs
    pub const IRI: &'static str = "http://www.w3.org/ns/r2rml#IRI";

    /// rr:BlankNode - term type for blank nodes
    pub const BLANK_NODE: &'static str = "http://www.w3.org/ns/r2rml#BlankNode";

    /// rr:Literal - term type for literals
    pub const LITERAL: &'static str = "http://www.w3.org/ns/r2rml#Literal";

    /// rr:defaultGraph - graph map value meaning "the default graph"
    pub const DEFAULT_GRAPH: &'static str = "http://www.w3.org/ns/r2rml#defaultGraph";
}

/// RML (core) vocabulary
pub struct RML;

impl RML {
    /// RML namespace IRI
    pub const NS: &'static str = "http://w3id.org/rml/";

    /// rml:IRI
    pub const IRI: &'static str = "http://w3id.org/rml/IRI";

    /// rml:BlankNode
    pub const BLANK_NODE: &'static str = "http://w3id.org/rml/BlankNode";

    /// rml:Literal
    pub const LITERAL: &'static str = "http://w3id.org/rml/Literal";

    /// rml:defaultGraph
    pub const DEFAULT_GRAPH: &'static str = "http://w3id.org/rml/defaultGraph";
}

/// Function Ontology (FnO) vocabulary
pub struct FNO;

impl FNO {
    /// FnO namespace IRI
    pub const NS: &'static str = "https://w3id.org/function/ontology#";

    /// fno:executes - links a function execution to the function IRI
    pub const EXECUTES: &'static str = "https://w3id.org/function/ontology#executes";

    /// fno:Execution - class of function executions
    pub const EXECUTION: &'static str = "https://w3id.org/function/ontology#Execution";
}

/// RDF vocabulary constants
pub mod rdf {
    /// rdf:type IRI
    pub const TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

    /// rdf:langString IRI
    pub const LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";
}

/// XSD vocabulary constants
pub mod xsd {
    /// xsd:string IRI
    pub const STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

    /// xsd:integer IRI
    pub const INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";

    /// xsd:double IRI
    pub const DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";

    /// xsd:boolean IRI
    pub const BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";

    /// xsd:dateTime IRI
    pub const DATE_TIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";
}

/// Check whether an IRI denotes the default graph in either namespace
pub fn is_default_graph(iri: &str) -> bool {
    iri == R2RML::DEFAULT_GRAPH || iri == RML::DEFAULT_GRAPH
}
