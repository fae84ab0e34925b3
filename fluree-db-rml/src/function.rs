//! Function registry for function-value term maps
//!
//! A function-value term map describes a call with a nested triples map:
//! its subject is the execution, `fno:executes` names the function, and every
//! other predicate binds a parameter. The engine turns those statements into a
//! [`FunctionExecution`] and invokes the function registered under that IRI.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::RmlResult;
use crate::term::{RdfTerm, Statement};
use crate::vocab::FNO;

/// A function callable from function-value term maps
///
/// Returned values are adapted into terms by the calling term map: `null` is
/// skipped, arrays produce one term per element.
pub trait RmlFunction: Send + Sync {
    /// Execute the function
    fn execute(&self, execution: &FunctionExecution) -> RmlResult<Vec<Value>>;
}

impl<F> RmlFunction for F
where
    F: Fn(&FunctionExecution) -> RmlResult<Vec<Value>> + Send + Sync,
{
    fn execute(&self, execution: &FunctionExecution) -> RmlResult<Vec<Value>> {
        self(execution)
    }
}

/// One function call, extracted from an execution description
#[derive(Debug, Clone)]
pub struct FunctionExecution {
    /// IRI of the function to call
    pub function: String,
    /// Parameter predicate IRI → bound values, in declaration order
    pub parameters: IndexMap<String, Vec<RdfTerm>>,
    /// The statements the execution was read from
    pub description: Vec<Statement>,
}

impl FunctionExecution {
    /// Extract every execution described by a set of statements
    ///
    /// Each subject carrying an `fno:executes` statement is one execution.
    /// Returns `None` if no subject names a function.
    pub fn from_description(description: Vec<Statement>) -> Option<Vec<FunctionExecution>> {
        let mut executions: IndexMap<RdfTerm, FunctionExecution> = IndexMap::new();
        for st in &description {
            if st.predicate.as_iri() != Some(FNO::EXECUTES) {
                continue;
            }
            executions
                .entry(st.subject.clone())
                .or_insert_with(|| FunctionExecution {
                    function: st.object.lexical().to_string(),
                    parameters: IndexMap::new(),
                    description: Vec::new(),
                });
        }
        if executions.is_empty() {
            return None;
        }

        for st in &description {
            if let Some(execution) = executions.get_mut(&st.subject) {
                execution.description.push(st.clone());
                if st.predicate.as_iri() == Some(FNO::EXECUTES) {
                    continue;
                }
                execution
                    .parameters
                    .entry(st.predicate.lexical().to_string())
                    .or_default()
                    .push(st.object.clone());
            }
        }
        Some(executions.into_values().collect())
    }

    /// First value bound to a parameter
    pub fn parameter(&self, parameter: &str) -> Option<&RdfTerm> {
        self.parameters.get(parameter).and_then(|v| v.first())
    }

    /// Lexical form of the first value bound to a parameter
    pub fn parameter_str(&self, parameter: &str) -> Option<&str> {
        self.parameter(parameter).map(RdfTerm::lexical)
    }

    /// All values bound to a parameter
    pub fn parameter_values(&self, parameter: &str) -> &[RdfTerm] {
        self.parameters
            .get(parameter)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Registry of functions by IRI
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<dyn RmlFunction>>,
}

impl FunctionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function, replacing any previous one with the same IRI
    pub fn register(&mut self, iri: impl Into<String>, function: impl RmlFunction + 'static) {
        self.functions.insert(iri.into(), Arc::new(function));
    }

    /// Builder form of [`register`](Self::register)
    pub fn with_function(
        mut self,
        iri: impl Into<String>,
        function: impl RmlFunction + 'static,
    ) -> Self {
        self.register(iri, function);
        self
    }

    /// Look up a function
    pub fn get(&self, iri: &str) -> Option<Arc<dyn RmlFunction>> {
        self.functions.get(iri).cloned()
    }

    /// Check whether a function is registered
    pub fn contains(&self, iri: &str) -> bool {
        self.functions.contains_key(iri)
    }

    /// Number of registered functions
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Check if no function is registered
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.functions.keys().collect();
        names.sort();
        f.debug_struct("FunctionRegistry")
            .field("functions", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const UPPER: &str = "http://example.com/fn/toUpper";
    const INPUT: &str = "http://example.com/fn/input";

    fn upper(execution: &FunctionExecution) -> RmlResult<Vec<Value>> {
        Ok(execution
            .parameter_str(INPUT)
            .map(|s| json!(s.to_uppercase()))
            .into_iter()
            .collect())
    }

    fn description() -> Vec<Statement> {
        let exec = RdfTerm::blank_node("e");
        vec![
            Statement::triple(exec.clone(), RdfTerm::iri(FNO::EXECUTES), RdfTerm::iri(UPPER)),
            Statement::triple(exec, RdfTerm::iri(INPUT), RdfTerm::string("abc")),
        ]
    }

    #[test]
    fn test_from_description() {
        let executions = FunctionExecution::from_description(description()).unwrap();
        assert_eq!(executions.len(), 1);
        assert_eq!(executions[0].function, UPPER);
        assert_eq!(executions[0].parameter_str(INPUT), Some("abc"));
        assert_eq!(executions[0].description.len(), 2);
        assert!(executions[0].parameter_values("missing").is_empty());
    }

    #[test]
    fn test_from_description_without_function() {
        let st = Statement::triple(
            RdfTerm::blank_node("e"),
            RdfTerm::iri(INPUT),
            RdfTerm::string("abc"),
        );
        assert!(FunctionExecution::from_description(vec![st]).is_none());
    }

    #[test]
    fn test_registry_executes_closure_and_fn() {
        let registry = FunctionRegistry::new()
            .with_function(UPPER, upper)
            .with_function(
                "http://example.com/fn/const",
                |_: &FunctionExecution| -> RmlResult<Vec<Value>> { Ok(vec![json!(42)]) },
            );
        assert_eq!(registry.len(), 2);
        assert!(registry.contains(UPPER));

        let execution = &FunctionExecution::from_description(description()).unwrap()[0];
        let result = registry.get(UPPER).unwrap().execute(execution).unwrap();
        assert_eq!(result, vec![json!("ABC")]);
        assert!(registry.get("http://example.com/fn/none").is_none());
    }
}
