//! Triples mapper
//!
//! Maps every record of a triples map's logical source. When other triples
//! maps join against this one, it also feeds its parent-side join index and
//! tracks which of those ref-object maps are done with it.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexSet;
use tracing::{debug, warn};

use crate::error::{RmlError, RmlResult};
use crate::generate::{BuildContext, TermGenerator, TermPosition};
use crate::mapping::{MappingGraph, ObjectMap, TermType, TriplesMap};
use crate::source::{lexical_values, DatatypeLookup, ExpressionEvaluation};
use crate::term::{RdfTerm, Statement};

use super::join::{CompletionTracker, ParentSideJoinIndex};
use super::predicate_object::PredicateObjectMapper;
use super::ref_object::RefObjectMapper;
use super::subject::SubjectMapper;

/// Ref-object maps pointing at one parent, collected before mappers are built
#[derive(Debug, Default)]
pub(crate) struct IncomingJoins {
    pub(crate) keys: Vec<Arc<str>>,
    pub(crate) references: IndexSet<String>,
}

/// Join state of a triples map that others join against
#[derive(Debug)]
struct ParentSide {
    references: Vec<String>,
    index: ParentSideJoinIndex,
    tracker: CompletionTracker,
}

/// Maps records of one triples map
#[derive(Debug)]
pub struct TriplesMapper {
    id: Arc<str>,
    subjects: Vec<SubjectMapper>,
    predicate_objects: Vec<PredicateObjectMapper>,
    parent_side: Option<ParentSide>,
}

impl TriplesMapper {
    /// Build a mapper
    ///
    /// `incoming` lists the ref-object maps of other mappers in the same run
    /// that join against this one.
    pub(crate) fn new(
        tm: &TriplesMap,
        graph: &MappingGraph,
        incoming: Option<IncomingJoins>,
        ctx: &BuildContext,
    ) -> RmlResult<Self> {
        if tm.subject_maps.is_empty() {
            return Err(RmlError::MissingSubjectMap(tm.id.clone()));
        }
        let id: Arc<str> = Arc::from(tm.id.as_str());

        let subjects = tm
            .subject_maps
            .iter()
            .map(|sm| SubjectMapper::new(sm, ctx))
            .collect::<RmlResult<Vec<_>>>()?;

        let mut predicate_objects = Vec::with_capacity(tm.predicate_object_maps.len());
        for (i, pom) in tm.predicate_object_maps.iter().enumerate() {
            let predicates = pom
                .predicate_maps
                .iter()
                .map(|p| TermGenerator::new(p, TermPosition::Predicate, ctx))
                .collect::<RmlResult<Vec<_>>>()?;
            let graphs = pom
                .graph_maps
                .iter()
                .map(|g| TermGenerator::new(g, TermPosition::Graph, ctx))
                .collect::<RmlResult<Vec<_>>>()?;

            let mut objects = Vec::new();
            let mut ref_objects = Vec::new();
            for (j, om) in pom.object_maps.iter().enumerate() {
                match om {
                    ObjectMap::Term(term_map) => {
                        objects.push(TermGenerator::new(term_map, TermPosition::Object, ctx)?);
                    }
                    ObjectMap::RefObjectMap(rom) => {
                        let parent = graph
                            .get(&rom.parent_triples_map)
                            .ok_or_else(|| RmlError::UnknownTriplesMap(rom.parent_triples_map.clone()))?;
                        if joins_same_record(tm, parent, rom.has_conditions()) {
                            objects.extend(parent_subject_generators(parent, ctx)?);
                        } else {
                            if !rom.has_conditions() {
                                warn!(
                                    triples_map = %tm.id,
                                    parent = %parent.id,
                                    "ref-object map without join conditions across logical sources never matches"
                                );
                            }
                            ref_objects.push(Arc::new(RefObjectMapper::new(
                                ref_object_key(&tm.id, i, j),
                                Arc::clone(&id),
                                rom,
                            )));
                        }
                    }
                }
            }

            predicate_objects.push(PredicateObjectMapper::new(
                predicates,
                objects,
                ref_objects,
                graphs,
            ));
        }

        let parent_side = incoming.filter(|i| !i.keys.is_empty()).map(|i| ParentSide {
            references: i.references.into_iter().collect(),
            index: ParentSideJoinIndex::new(),
            tracker: CompletionTracker::new(i.keys),
        });

        Ok(Self {
            id,
            subjects,
            predicate_objects,
            parent_side,
        })
    }

    /// Build the mapper of a function-value execution description
    pub(crate) fn for_function(tm: &TriplesMap, ctx: &BuildContext) -> RmlResult<Self> {
        if tm.has_ref_object_maps() {
            return Err(RmlError::config(
                tm.id.as_str(),
                "function execution mappings cannot reference other triples maps",
            ));
        }
        Self::new(tm, &MappingGraph::default(), None, ctx)
    }

    pub fn id(&self) -> &Arc<str> {
        &self.id
    }

    /// Every ref-object mapper owned by this mapper
    pub fn ref_object_mappers(&self) -> impl Iterator<Item = &Arc<RefObjectMapper>> {
        self.predicate_objects
            .iter()
            .flat_map(|pom| pom.ref_objects().iter())
    }

    /// Check whether other mappers join against this one
    pub fn is_join_parent(&self) -> bool {
        self.parent_side.is_some()
    }

    /// The parent-side join index, if other mappers join against this one
    pub fn join_index(&self) -> Option<&ParentSideJoinIndex> {
        self.parent_side.as_ref().map(|p| &p.index)
    }

    /// Check whether mapping a record calls registered functions
    pub fn requires_blocking(&self) -> bool {
        self.subjects.iter().any(SubjectMapper::is_function_valued)
            || self
                .predicate_objects
                .iter()
                .any(PredicateObjectMapper::is_function_valued)
    }

    /// Map one record
    ///
    /// Returns the joinless statements. Ref-object maps capture the record
    /// and, when this mapper is a join parent, the record's subjects are
    /// added to the join index.
    pub fn map_record(
        &self,
        eval: &dyn ExpressionEvaluation,
        datatypes: &dyn DatatypeLookup,
    ) -> RmlResult<Vec<Statement>> {
        let mut out = Vec::new();
        let mut record_subjects: IndexSet<RdfTerm> = IndexSet::new();

        for subject_mapper in &self.subjects {
            let Some(mut mapping) = subject_mapper.map(eval, datatypes)? else {
                continue;
            };
            out.append(&mut mapping.type_statements);
            for pom in &self.predicate_objects {
                pom.map(&mapping, eval, datatypes, &mut out)?;
            }
            if self.parent_side.is_some() {
                record_subjects.extend(mapping.subjects);
            }
        }

        if let Some(parent) = &self.parent_side {
            if !record_subjects.is_empty() {
                for reference in &parent.references {
                    let values = eval.evaluate(reference).map(lexical_values).map_err(|e| {
                        RmlError::term_generation(&*self.id, format!("evaluating {reference:?}: {e}"))
                    })?;
                    for value in values {
                        parent.index.insert(reference, value, &record_subjects);
                    }
                }
            }
        }

        Ok(out)
    }

    /// A dependent ref-object map is done with the join index
    ///
    /// Returns true when this notification released the index.
    pub fn notify_completion(&self, ref_key: &str) -> bool {
        let Some(parent) = &self.parent_side else {
            return false;
        };
        if parent.tracker.notify(ref_key) {
            let entries = parent.index.len();
            parent.index.clear();
            debug!(triples_map = %self.id, entries, "released join index");
            true
        } else {
            false
        }
    }
}

/// Key of the `j`-th object map of the `i`-th predicate-object map
pub(crate) fn ref_object_key(tm_id: &str, i: usize, j: usize) -> Arc<str> {
    Arc::from(format!("{tm_id}/pom[{i}]/object[{j}]"))
}

/// A ref-object map without conditions over the same logical source refers to
/// the parent subjects of the very same record
pub(crate) fn joins_same_record(child: &TriplesMap, parent: &TriplesMap, has_conditions: bool) -> bool {
    !has_conditions && child.logical_source == parent.logical_source
}

fn parent_subject_generators(
    parent: &TriplesMap,
    ctx: &BuildContext,
) -> RmlResult<Vec<TermGenerator>> {
    parent
        .subject_maps
        .iter()
        .map(|sm| {
            let mut term_map = sm.term_map.clone();
            term_map.term_type.get_or_insert(TermType::Iri);
            TermGenerator::new(&term_map, TermPosition::Object, ctx)
        })
        .collect()
}

/// Collect, per parent, the ref-object maps of `maps` that need a join
pub(crate) fn collect_incoming<'a>(
    graph: &MappingGraph,
    maps: impl IntoIterator<Item = &'a TriplesMap>,
) -> RmlResult<HashMap<String, IncomingJoins>> {
    let mut incoming: HashMap<String, IncomingJoins> = HashMap::new();
    for tm in maps {
        for (i, pom) in tm.predicate_object_maps.iter().enumerate() {
            for (j, om) in pom.object_maps.iter().enumerate() {
                let ObjectMap::RefObjectMap(rom) = om else {
                    continue;
                };
                let parent = graph
                    .get(&rom.parent_triples_map)
                    .ok_or_else(|| RmlError::UnknownTriplesMap(rom.parent_triples_map.clone()))?;
                if joins_same_record(tm, parent, rom.has_conditions()) {
                    continue;
                }
                let entry = incoming.entry(parent.id.clone()).or_default();
                entry.keys.push(ref_object_key(&tm.id, i, j));
                entry
                    .references
                    .extend(rom.parent_references().into_iter().map(str::to_string));
            }
        }
    }
    Ok(incoming)
}
