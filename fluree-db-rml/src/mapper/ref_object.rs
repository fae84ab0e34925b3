//! Ref-object mapper
//!
//! Child records are captured while the child stream runs; once both the
//! child and the parent stream have ended the captured entries are resolved
//! against the parent's join index, exactly once.

use std::sync::Arc;

use indexmap::IndexSet;
use tracing::trace;

use crate::error::{RmlError, RmlResult};
use crate::mapping::{JoinCondition, RefObjectMap};
use crate::source::{lexical_values, ExpressionEvaluation};
use crate::term::{RdfTerm, Statement};

use super::join::{ChildJoinCondition, ChildSideJoin, ChildSideJoinStore, ParentSideJoinIndex};

/// Resolves one ref-object map of a child triples map
#[derive(Debug)]
pub struct RefObjectMapper {
    key: Arc<str>,
    child: Arc<str>,
    parent: Arc<str>,
    conditions: Vec<JoinCondition>,
    store: ChildSideJoinStore,
}

impl RefObjectMapper {
    pub fn new(key: Arc<str>, child: Arc<str>, ref_object_map: &RefObjectMap) -> Self {
        Self {
            key,
            child,
            parent: Arc::from(ref_object_map.parent_triples_map.as_str()),
            conditions: ref_object_map.join_conditions.clone(),
            store: ChildSideJoinStore::new(),
        }
    }

    /// Unique key, also used to notify the parent
    pub fn key(&self) -> &Arc<str> {
        &self.key
    }

    /// Id of the triples map owning this ref-object map
    pub fn child_triples_map(&self) -> &Arc<str> {
        &self.child
    }

    /// Id of the parent triples map
    pub fn parent_triples_map(&self) -> &Arc<str> {
        &self.parent
    }

    /// Parent references the parent's join index must cover
    pub fn parent_references(&self) -> impl Iterator<Item = &str> {
        self.conditions.iter().map(|jc| jc.parent_reference.as_str())
    }

    /// Number of captured entries waiting to be resolved
    pub fn pending(&self) -> usize {
        self.store.len()
    }

    /// Capture a child record for later resolution
    pub fn capture(
        &self,
        subjects: &IndexSet<RdfTerm>,
        graphs: &IndexSet<Option<RdfTerm>>,
        predicates: &IndexSet<RdfTerm>,
        eval: &dyn ExpressionEvaluation,
    ) -> RmlResult<()> {
        if self.conditions.is_empty() {
            return Ok(());
        }

        let mut conditions = Vec::with_capacity(self.conditions.len());
        for jc in &self.conditions {
            let child_values = eval
                .evaluate(&jc.child_reference)
                .map(lexical_values)
                .map_err(|e| {
                    RmlError::term_generation(
                        &*self.key,
                        format!("evaluating {:?}: {e}", jc.child_reference),
                    )
                })?;
            if child_values.is_empty() {
                trace!(key = %self.key, reference = %jc.child_reference, "child record has no join value");
                return Ok(());
            }
            conditions.push(ChildJoinCondition {
                child_reference: jc.child_reference.clone(),
                child_values,
                parent_reference: jc.parent_reference.clone(),
            });
        }

        self.store.add(ChildSideJoin {
            subjects: subjects.clone(),
            predicates: predicates.clone(),
            graphs: graphs.clone(),
            conditions,
        });
        Ok(())
    }

    /// Resolve every captured entry against the parent's join index
    ///
    /// Drains the store: a second call without new captures yields nothing.
    pub fn resolve(&self, index: &ParentSideJoinIndex) -> Vec<Statement> {
        let mut out = Vec::new();
        for entry in self.store.drain() {
            let parents = match_parents(&entry.conditions, index);
            if parents.is_empty() {
                continue;
            }
            for subject in &entry.subjects {
                for predicate in &entry.predicates {
                    for parent in &parents {
                        for graph in &entry.graphs {
                            out.push(Statement::new(
                                subject.clone(),
                                predicate.clone(),
                                parent.clone(),
                                graph.clone(),
                            ));
                        }
                    }
                }
            }
        }
        out
    }
}

/// Union lookups within a condition, intersect across conditions
///
/// No conditions match nothing.
fn match_parents(
    conditions: &[ChildJoinCondition],
    index: &ParentSideJoinIndex,
) -> IndexSet<RdfTerm> {
    let mut result: Option<IndexSet<RdfTerm>> = None;

    for condition in conditions {
        let mut matched = IndexSet::new();
        for value in &condition.child_values {
            if let Some(subjects) = index.lookup(&condition.parent_reference, value) {
                matched.extend(subjects);
            }
        }

        let narrowed = match result {
            None => matched,
            Some(acc) => acc.intersection(&matched).cloned().collect(),
        };
        if narrowed.is_empty() {
            return narrowed;
        }
        result = Some(narrowed);
    }

    result.unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::JsonRecord;
    use serde_json::json;

    fn set(iris: &[&str]) -> IndexSet<RdfTerm> {
        iris.iter().map(|i| RdfTerm::iri(*i)).collect()
    }

    fn default_graph() -> IndexSet<Option<RdfTerm>> {
        IndexSet::from([None])
    }

    fn mapper(rom: &RefObjectMap) -> RefObjectMapper {
        RefObjectMapper::new(Arc::from("<#Child>/pom[0]/object[0]"), Arc::from("<#Child>"), rom)
    }

    #[test]
    fn test_duplicate_parent_values_join_all_parents() {
        let index = ParentSideJoinIndex::new();
        index.insert("code", "BE".to_string(), &set(&["http://ex/P1"]));
        index.insert("code", "BE".to_string(), &set(&["http://ex/P2"]));

        let rom = mapper(&RefObjectMap::new("<#Parent>", "country", "code"));
        rom.capture(
            &set(&["http://ex/C1"]),
            &default_graph(),
            &set(&["http://ex/country"]),
            &JsonRecord::new(json!({"country": "BE"})),
        )
        .unwrap();

        let objects: Vec<_> = rom.resolve(&index).into_iter().map(|s| s.object).collect();
        assert_eq!(objects, vec![RdfTerm::iri("http://ex/P1"), RdfTerm::iri("http://ex/P2")]);
    }

    #[test]
    fn test_conditions_intersect() {
        let index = ParentSideJoinIndex::new();
        index.insert("a", "1".to_string(), &set(&["http://ex/P1", "http://ex/P2"]));
        index.insert("b", "2".to_string(), &set(&["http://ex/P2", "http://ex/P3"]));

        let rom = mapper(&RefObjectMap::with_conditions(
            "<#Parent>",
            vec![JoinCondition::new("x", "a"), JoinCondition::new("y", "b")],
        ));
        rom.capture(
            &set(&["http://ex/C"]),
            &default_graph(),
            &set(&["http://ex/p"]),
            &JsonRecord::new(json!({"x": "1", "y": "2"})),
        )
        .unwrap();

        let statements = rom.resolve(&index);
        assert_eq!(statements.len(), 1);
        assert_eq!(statements[0].object, RdfTerm::iri("http://ex/P2"));
    }

    #[test]
    fn test_multi_valued_child_unions_within_condition() {
        let index = ParentSideJoinIndex::new();
        index.insert("id", "1".to_string(), &set(&["http://ex/P1"]));
        index.insert("id", "2".to_string(), &set(&["http://ex/P2"]));

        let rom = mapper(&RefObjectMap::new("<#Parent>", "refs", "id"));
        rom.capture(
            &set(&["http://ex/C"]),
            &IndexSet::from([Some(RdfTerm::iri("http://ex/g"))]),
            &set(&["http://ex/p"]),
            &JsonRecord::new(json!({"refs": ["1", "2", "3"]})),
        )
        .unwrap();

        let statements = rom.resolve(&index);
        assert_eq!(statements.len(), 2);
        assert!(statements
            .iter()
            .all(|s| s.graph == Some(RdfTerm::iri("http://ex/g"))));
    }

    #[test]
    fn test_missing_child_value_is_not_captured() {
        let rom = mapper(&RefObjectMap::new("<#Parent>", "country", "code"));
        rom.capture(
            &set(&["http://ex/C"]),
            &default_graph(),
            &set(&["http://ex/p"]),
            &JsonRecord::new(json!({"other": 1})),
        )
        .unwrap();
        assert_eq!(rom.pending(), 0);
    }

    #[test]
    fn test_resolve_is_drain_once() {
        let index = ParentSideJoinIndex::new();
        index.insert("code", "BE".to_string(), &set(&["http://ex/P1"]));

        let rom = mapper(&RefObjectMap::new("<#Parent>", "country", "code"));
        rom.capture(
            &set(&["http://ex/C"]),
            &default_graph(),
            &set(&["http://ex/p"]),
            &JsonRecord::new(json!({"country": "BE"})),
        )
        .unwrap();
        assert_eq!(rom.pending(), 1);

        assert_eq!(rom.resolve(&index).len(), 1);
        assert!(rom.resolve(&index).is_empty());
    }

    #[test]
    fn test_no_conditions_match_nothing() {
        assert!(match_parents(&[], &ParentSideJoinIndex::new()).is_empty());
    }
}
