//! Term generation
//!
//! A [`TermGenerator`] is built once per term map and then produces the RDF
//! terms of that term map for every record.

mod template;
mod term_generator;

use std::sync::Arc;

use crate::config::RmlConfig;
use crate::function::FunctionRegistry;

pub use template::{iri_escape, Template};
pub use term_generator::{TermGenerator, TermPosition};

/// Shared state needed while building generators
#[derive(Debug, Clone, Default)]
pub struct BuildContext {
    /// Base IRI for resolving relative IRIs
    pub base_iri: Option<Arc<str>>,
    /// Functions available to function-value term maps
    pub functions: Arc<FunctionRegistry>,
}

impl BuildContext {
    /// Create a build context from engine configuration and functions
    pub fn new(config: &RmlConfig, functions: Arc<FunctionRegistry>) -> Self {
        Self {
            base_iri: config.base_iri.as_deref().map(Arc::from),
            functions,
        }
    }
}
