//! Generated RDF terms and statements
//!
//! These are the values the mapping engine produces. They carry expanded
//! IRIs only; prefix handling is left to whatever serializes them.

use std::fmt;

use crate::vocab::{rdf, xsd};

/// Materialized RDF term
///
/// Represents an RDF term generated from a record according to a term map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RdfTerm {
    /// An IRI
    Iri(String),
    /// A blank node with local identifier (no `_:` prefix)
    BlankNode(String),
    /// A literal with optional datatype and language
    Literal {
        value: String,
        datatype: Option<String>,
        language: Option<String>,
    },
}

impl RdfTerm {
    /// Create an IRI term
    pub fn iri(iri: impl Into<String>) -> Self {
        RdfTerm::Iri(iri.into())
    }

    /// Create a blank node term
    pub fn blank_node(id: impl Into<String>) -> Self {
        RdfTerm::BlankNode(id.into())
    }

    /// Create a plain string literal
    pub fn string(value: impl Into<String>) -> Self {
        RdfTerm::Literal {
            value: value.into(),
            datatype: None,
            language: None,
        }
    }

    /// Create a typed literal
    pub fn typed(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        RdfTerm::Literal {
            value: value.into(),
            datatype: Some(datatype.into()),
            language: None,
        }
    }

    /// Create a language-tagged string
    pub fn lang_string(value: impl Into<String>, lang: impl Into<String>) -> Self {
        RdfTerm::Literal {
            value: value.into(),
            datatype: Some(rdf::LANG_STRING.to_string()),
            language: Some(lang.into()),
        }
    }

    /// Check if this is an IRI
    pub fn is_iri(&self) -> bool {
        matches!(self, RdfTerm::Iri(_))
    }

    /// Check if this is a blank node
    pub fn is_blank_node(&self) -> bool {
        matches!(self, RdfTerm::BlankNode(_))
    }

    /// Check if this is a literal
    pub fn is_literal(&self) -> bool {
        matches!(self, RdfTerm::Literal { .. })
    }

    /// Get as IRI string if this is an IRI
    pub fn as_iri(&self) -> Option<&str> {
        match self {
            RdfTerm::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    /// Lexical value: the IRI, the blank node id, or the literal value
    pub fn lexical(&self) -> &str {
        match self {
            RdfTerm::Iri(iri) => iri,
            RdfTerm::BlankNode(id) => id,
            RdfTerm::Literal { value, .. } => value,
        }
    }
}

impl fmt::Display for RdfTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RdfTerm::Iri(iri) => write!(f, "<{iri}>"),
            RdfTerm::BlankNode(id) => write!(f, "_:{id}"),
            RdfTerm::Literal {
                value,
                datatype,
                language,
            } => {
                f.write_str("\"")?;
                for c in value.chars() {
                    match c {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        '\r' => f.write_str("\\r")?,
                        c => write!(f, "{c}")?,
                    }
                }
                f.write_str("\"")?;
                match (language, datatype) {
                    (Some(lang), _) => write!(f, "@{lang}"),
                    (None, Some(dt)) if dt != xsd::STRING => write!(f, "^^<{dt}>"),
                    _ => Ok(()),
                }
            }
        }
    }
}

/// An output statement: a triple plus an optional graph name
///
/// `graph: None` places the statement in the default graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Statement {
    pub subject: RdfTerm,
    pub predicate: RdfTerm,
    pub object: RdfTerm,
    pub graph: Option<RdfTerm>,
}

impl Statement {
    /// Create a statement
    pub fn new(
        subject: RdfTerm,
        predicate: RdfTerm,
        object: RdfTerm,
        graph: Option<RdfTerm>,
    ) -> Self {
        Self {
            subject,
            predicate,
            object,
            graph,
        }
    }

    /// Create a statement in the default graph
    pub fn triple(subject: RdfTerm, predicate: RdfTerm, object: RdfTerm) -> Self {
        Self::new(subject, predicate, object, None)
    }
}

/// N-Quads rendering (without the trailing newline)
impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)?;
        if let Some(graph) = &self.graph {
            write!(f, " {graph}")?;
        }
        f.write_str(" .")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_constructors() {
        assert!(RdfTerm::iri("http://example.org/a").is_iri());
        assert!(RdfTerm::blank_node("b0").is_blank_node());
        assert!(RdfTerm::string("x").is_literal());
        assert_eq!(
            RdfTerm::iri("http://example.org/a").as_iri(),
            Some("http://example.org/a")
        );
        assert_eq!(RdfTerm::typed("1", xsd::INTEGER).lexical(), "1");
    }

    #[test]
    fn test_literal_display_escapes() {
        let term = RdfTerm::string("say \"hi\"\n");
        assert_eq!(term.to_string(), r#""say \"hi\"\n""#);
        assert_eq!(RdfTerm::lang_string("chat", "fr").to_string(), "\"chat\"@fr");
        assert_eq!(
            RdfTerm::typed("7", xsd::INTEGER).to_string(),
            format!("\"7\"^^<{}>", xsd::INTEGER)
        );
    }

    #[test]
    fn test_statement_nquads() {
        let st = Statement::new(
            RdfTerm::iri("http://ex/s"),
            RdfTerm::iri("http://ex/p"),
            RdfTerm::blank_node("o"),
            Some(RdfTerm::iri("http://ex/g")),
        );
        assert_eq!(st.to_string(), "<http://ex/s> <http://ex/p> _:o <http://ex/g> .");

        let st = Statement::triple(
            RdfTerm::iri("http://ex/s"),
            RdfTerm::iri("http://ex/p"),
            RdfTerm::string("v"),
        );
        assert_eq!(st.to_string(), "<http://ex/s> <http://ex/p> \"v\" .");
    }
}
