//! RML error types

use thiserror::Error;

/// RML mapping errors
///
/// Configuration errors are raised while building mappers, before any record
/// is read. Term generation errors are raised per record and fail the stream
/// of the triples map that owns the offending rule.
#[derive(Debug, Error)]
pub enum RmlError {
    /// Invalid rule configuration (term type, expression form, position)
    #[error("Invalid mapping rule {rule}: {message}")]
    Config { rule: String, message: String },

    /// Triples map declares no subject map
    #[error("TriplesMap {0} has no subject map")]
    MissingSubjectMap(String),

    /// Reference to non-existent TriplesMap
    #[error("Unknown TriplesMap: {0}")]
    UnknownTriplesMap(String),

    /// Invalid template syntax
    #[error("Invalid template {template:?}: {message}")]
    InvalidTemplate { template: String, message: String },

    /// Term generation failed for a record
    #[error("Term generation failed for rule {rule}: {message}")]
    TermGeneration { rule: String, message: String },

    /// Generated lexical form is not a valid IRI, even against the base IRI
    #[error("Rule {rule} generated an invalid IRI: {value}")]
    InvalidIri { rule: String, value: String },

    /// Generated language tag is not valid BCP 47
    #[error("Rule {rule} generated an invalid language tag: {tag}")]
    InvalidLanguageTag { rule: String, tag: String },

    /// Function-value rule names a function that is not registered
    #[error("Rule {rule} calls unregistered function {function}")]
    UnregisteredFunction { rule: String, function: String },

    /// Reference expression could not be evaluated against a record
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// Record source failure
    #[error("Source error for {source_name}: {message}")]
    Source {
        source_name: String,
        message: String,
    },

    /// Registered function failed
    #[error("Function {function} failed: {message}")]
    Function { function: String, message: String },

    /// A triples map pipeline failed
    #[error("TriplesMap {triples_map} failed: {source}")]
    Mapper {
        triples_map: String,
        #[source]
        source: Box<RmlError>,
    },

    /// Invalid engine configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Internal runtime failure (task panicked or was cancelled)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RmlError {
    /// Create a configuration error for a rule
    pub fn config(rule: impl Into<String>, message: impl Into<String>) -> Self {
        RmlError::Config {
            rule: rule.into(),
            message: message.into(),
        }
    }

    /// Create a term generation error for a rule
    pub fn term_generation(rule: impl Into<String>, message: impl Into<String>) -> Self {
        RmlError::TermGeneration {
            rule: rule.into(),
            message: message.into(),
        }
    }

    /// Wrap this error with the identity of the triples map it surfaced in
    ///
    /// Already wrapped errors are returned unchanged so nested function-value
    /// mappings keep the outermost owner.
    pub fn in_triples_map(self, triples_map: impl Into<String>) -> Self {
        match self {
            wrapped @ RmlError::Mapper { .. } => wrapped,
            other => RmlError::Mapper {
                triples_map: triples_map.into(),
                source: Box::new(other),
            },
        }
    }

    /// Check whether this is a configuration-time error
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            RmlError::Config { .. }
                | RmlError::MissingSubjectMap(_)
                | RmlError::UnknownTriplesMap(_)
                | RmlError::InvalidTemplate { .. }
                | RmlError::InvalidConfig(_)
        )
    }
}

/// Result type for RML operations
pub type RmlResult<T> = Result<T, RmlError>;
