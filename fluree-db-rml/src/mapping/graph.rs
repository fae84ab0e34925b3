//! Mapping rule graph

use indexmap::IndexMap;

use super::{LogicalSource, TriplesMap};

/// Complete mapping rule graph
///
/// All TriplesMap definitions of a mapping document, indexed by the logical
/// source they read. Insertion order is preserved so builds are deterministic.
#[derive(Debug, Clone, Default)]
pub struct MappingGraph {
    /// All TriplesMap definitions, keyed by id
    triples_maps: IndexMap<String, TriplesMap>,

    /// Index: logical source → TriplesMap ids that read it
    source_to_maps: IndexMap<LogicalSource, Vec<String>>,
}

impl MappingGraph {
    /// Create a new MappingGraph from a list of TriplesMap definitions
    pub fn new(triples_maps: Vec<TriplesMap>) -> Self {
        let mut mapping = Self::default();

        for tm in triples_maps {
            mapping.add_triples_map(tm);
        }

        mapping
    }

    /// Add a TriplesMap and update indexes
    ///
    /// A TriplesMap with an id that is already present replaces the old one.
    pub fn add_triples_map(&mut self, tm: TriplesMap) {
        let tm_id = tm.id.clone();
        if self.triples_maps.contains_key(&tm_id) {
            self.remove_from_indexes(&tm_id);
        }

        self.source_to_maps
            .entry(tm.logical_source.clone())
            .or_default()
            .push(tm_id.clone());
        self.triples_maps.insert(tm_id, tm);
    }

    fn remove_from_indexes(&mut self, tm_id: &str) {
        for ids in self.source_to_maps.values_mut() {
            ids.retain(|id| id != tm_id);
        }
        self.source_to_maps.retain(|_, ids| !ids.is_empty());
    }

    /// Get a TriplesMap by id
    pub fn get(&self, id: &str) -> Option<&TriplesMap> {
        self.triples_maps.get(id)
    }

    /// Iterate all TriplesMaps in insertion order
    pub fn triples_maps(&self) -> impl Iterator<Item = &TriplesMap> {
        self.triples_maps.values()
    }

    /// Get the number of TriplesMap definitions
    pub fn len(&self) -> usize {
        self.triples_maps.len()
    }

    /// Check if the mapping is empty
    pub fn is_empty(&self) -> bool {
        self.triples_maps.is_empty()
    }

    /// All distinct logical sources, in first-use order
    pub fn logical_sources(&self) -> impl Iterator<Item = &LogicalSource> {
        self.source_to_maps.keys()
    }

    /// TriplesMaps that read a given logical source
    pub fn find_maps_for_source(&self, source: &LogicalSource) -> Vec<&TriplesMap> {
        self.source_to_maps
            .get(source)
            .map(|ids| ids.iter().filter_map(|id| self.triples_maps.get(id)).collect())
            .unwrap_or_default()
    }
}
