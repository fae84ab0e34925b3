//! Record mappers
//!
//! One [`TriplesMapper`] is built per triples map for each mapping run. It
//! owns the subject, predicate-object and ref-object mappers of that rule,
//! and the join state other rules resolve against.

pub mod join;
mod predicate_object;
mod ref_object;
mod subject;
mod triples;

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};

use crate::error::{RmlError, RmlResult};
use crate::generate::{BuildContext, TermGenerator};
use crate::mapping::{LogicalSource, MappingGraph, TriplesMap};
use crate::source::{DatatypeLookup, ExpressionEvaluation};
use crate::term::RdfTerm;
use crate::vocab::is_default_graph;

pub use predicate_object::PredicateObjectMapper;
pub use ref_object::RefObjectMapper;
pub use subject::{SubjectMapper, SubjectMapping};
pub use triples::TriplesMapper;

/// Every mapper of one mapping run, in mapping graph order
#[derive(Debug)]
pub struct MapperSet {
    mappers: IndexMap<Arc<str>, Arc<TriplesMapper>>,
    by_source: IndexMap<LogicalSource, Vec<Arc<TriplesMapper>>>,
}

impl MapperSet {
    /// Build mappers for every triples map of a mapping graph
    pub fn build(graph: &MappingGraph, ctx: &BuildContext) -> RmlResult<Self> {
        Self::build_maps(graph, graph.triples_maps().collect(), ctx)
    }

    /// Build mappers for the given triples maps and every parent they join against
    pub fn build_for<S: AsRef<str>>(
        graph: &MappingGraph,
        ids: &[S],
        ctx: &BuildContext,
    ) -> RmlResult<Self> {
        let mut wanted: HashSet<&str> = HashSet::new();
        let mut queue: Vec<&str> = ids.iter().map(AsRef::as_ref).collect();
        while let Some(id) = queue.pop() {
            if !wanted.insert(id) {
                continue;
            }
            let tm = graph
                .get(id)
                .ok_or_else(|| RmlError::UnknownTriplesMap(id.to_string()))?;
            for pom in &tm.predicate_object_maps {
                queue.extend(pom.ref_object_maps().map(|rom| rom.parent_triples_map.as_str()));
            }
        }

        let maps = graph
            .triples_maps()
            .filter(|tm| wanted.contains(tm.id.as_str()))
            .collect();
        Self::build_maps(graph, maps, ctx)
    }

    fn build_maps(graph: &MappingGraph, maps: Vec<&TriplesMap>, ctx: &BuildContext) -> RmlResult<Self> {
        let mut incoming = triples::collect_incoming(graph, maps.iter().copied())?;

        let mut mappers = IndexMap::with_capacity(maps.len());
        for tm in maps {
            let mapper = TriplesMapper::new(tm, graph, incoming.remove(&tm.id), ctx)?;
            mappers.insert(Arc::clone(mapper.id()), Arc::new(mapper));
        }

        let mut by_source = IndexMap::new();
        for source in graph.logical_sources() {
            let group: Vec<_> = graph
                .find_maps_for_source(source)
                .into_iter()
                .filter_map(|tm| mappers.get(tm.id.as_str()).cloned())
                .collect();
            if !group.is_empty() {
                by_source.insert(source.clone(), group);
            }
        }
        Ok(Self { mappers, by_source })
    }

    pub fn get(&self, id: &str) -> Option<&Arc<TriplesMapper>> {
        self.mappers.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<TriplesMapper>> {
        self.mappers.values()
    }

    pub fn len(&self) -> usize {
        self.mappers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappers.is_empty()
    }

    /// Mappers grouped by the logical source they consume
    ///
    /// Sources come in first-use order; sources no built mapper reads are left out.
    pub fn by_source(&self) -> &IndexMap<LogicalSource, Vec<Arc<TriplesMapper>>> {
        &self.by_source
    }
}

/// Generate graph terms; `rr:defaultGraph` becomes `None`
pub(crate) fn generate_graphs(
    generators: &[TermGenerator],
    eval: &dyn ExpressionEvaluation,
    datatypes: &dyn DatatypeLookup,
) -> RmlResult<IndexSet<Option<RdfTerm>>> {
    let mut graphs = IndexSet::new();
    for generator in generators {
        for term in generator.generate(eval, datatypes)? {
            if term.as_iri().is_some_and(is_default_graph) {
                graphs.insert(None);
            } else {
                graphs.insert(Some(term));
            }
        }
    }
    Ok(graphs)
}

/// No graph at all means the default graph
pub(crate) fn or_default_graph(graphs: IndexSet<Option<RdfTerm>>) -> IndexSet<Option<RdfTerm>> {
    if graphs.is_empty() {
        IndexSet::from([None])
    } else {
        graphs
    }
}
