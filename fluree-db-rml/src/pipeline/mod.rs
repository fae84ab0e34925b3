//! Mapping pipeline
//!
//! Wires one mapping run as a set of tokio tasks:
//!
//! ```text
//!  RecordSource ──▶ RecordMulticast ──┬──▶ consumer (TriplesMap A) ──┐
//!   (per logical     (per logical     └──▶ consumer (TriplesMap B) ──┤
//!    source)          source)                                        ├──▶ MappingStream
//!                                 JoinBarrier ──▶ resolve (A ⋈ B) ───┘
//! ```
//!
//! Consumers emit joinless statements as records arrive. Each ref-object map
//! gets a resolution task that waits until both its child and its parent
//! consumer have finished, resolves the captured joins against the parent's
//! index, and then tells the parent it is done with that index.

mod multicast;
mod stream;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::stream as futures_stream;
use futures::StreamExt;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, Instrument};

use crate::config::RmlConfig;
use crate::error::{RmlError, RmlResult};
use crate::function::FunctionRegistry;
use crate::generate::BuildContext;
use crate::mapper::join::JoinBarrier;
use crate::mapper::{MapperSet, RefObjectMapper, TriplesMapper};
use crate::mapping::MappingGraph;
use crate::source::{DatatypeLookup, Record, RecordSource};
use crate::term::Statement;

pub use multicast::{RecordMulticast, RecordReceiver};
pub use stream::{MappedStatement, MappingStream};

type Output = mpsc::Sender<RmlResult<MappedStatement>>;

/// Executes a mapping graph against record sources
///
/// Building validates every rule, so configuration errors surface from
/// [`RmlMapper::new`]. Each call to [`map`](RmlMapper::map) is an independent
/// run with its own join state.
#[derive(Debug)]
pub struct RmlMapper {
    mapping: MappingGraph,
    config: RmlConfig,
    ctx: BuildContext,
}

impl RmlMapper {
    /// Validate a mapping and prepare it for execution
    pub fn new(
        mapping: MappingGraph,
        config: RmlConfig,
        functions: FunctionRegistry,
    ) -> RmlResult<Self> {
        config.validate()?;
        let ctx = BuildContext::new(&config, Arc::new(functions));
        let mappers = MapperSet::build(&mapping, &ctx)?;
        debug!(
            triples_maps = mappers.len(),
            sources = mapping.logical_sources().count(),
            "mapping validated"
        );
        Ok(Self {
            mapping,
            config,
            ctx,
        })
    }

    pub fn mapping(&self) -> &MappingGraph {
        &self.mapping
    }

    pub fn config(&self) -> &RmlConfig {
        &self.config
    }

    /// Map every triples map
    ///
    /// Must be called within a tokio runtime.
    pub fn map(&self, source: Arc<dyn RecordSource>) -> MappingStream {
        match MapperSet::build(&self.mapping, &self.ctx) {
            Ok(mappers) => self.run(mappers, None, source),
            Err(e) => MappingStream::failed(e),
        }
    }

    /// Map only the given triples maps
    ///
    /// Parents they join against are still read, but only statements of the
    /// selected triples maps are emitted.
    pub fn map_triples_maps<S: AsRef<str>>(
        &self,
        source: Arc<dyn RecordSource>,
        ids: &[S],
    ) -> MappingStream {
        let selected: HashSet<Arc<str>> = ids.iter().map(|id| Arc::from(id.as_ref())).collect();
        match MapperSet::build_for(&self.mapping, ids, &self.ctx) {
            Ok(mappers) => self.run(mappers, Some(selected), source),
            Err(e) => MappingStream::failed(e),
        }
    }

    fn run(
        &self,
        mappers: MapperSet,
        selected: Option<HashSet<Arc<str>>>,
        source: Arc<dyn RecordSource>,
    ) -> MappingStream {
        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        let mut tasks = JoinSet::new();
        let emits = |id: &Arc<str>| selected.as_ref().map_or(true, |s| s.contains(id));

        // Join resolution, one barrier per ref-object map
        let mut as_child: HashMap<Arc<str>, Vec<Arc<JoinBarrier>>> = HashMap::new();
        let mut as_parent: HashMap<Arc<str>, Vec<Arc<JoinBarrier>>> = HashMap::new();
        for child in mappers.iter() {
            for rom in child.ref_object_mappers() {
                let Some(parent) = mappers.get(rom.parent_triples_map()) else {
                    return MappingStream::failed(RmlError::UnknownTriplesMap(
                        rom.parent_triples_map().to_string(),
                    ));
                };
                let barrier = Arc::new(JoinBarrier::new());
                as_child
                    .entry(Arc::clone(child.id()))
                    .or_default()
                    .push(Arc::clone(&barrier));
                as_parent
                    .entry(Arc::clone(parent.id()))
                    .or_default()
                    .push(Arc::clone(&barrier));

                let span = tracing::debug_span!(
                    "rml_resolve_join",
                    key = %rom.key(),
                    parent = %parent.id(),
                );
                tasks.spawn(
                    resolve_join(
                        Arc::clone(rom),
                        Arc::clone(parent),
                        barrier,
                        emits(child.id()).then(|| tx.clone()),
                    )
                    .instrument(span),
                );
            }
        }

        // One multicast per logical source, one consumer per triples map
        let blocking = Arc::new(Semaphore::new(self.config.max_blocking_evaluations));
        for (logical_source, group) in mappers.by_source() {
            let multicast = Arc::new(RecordMulticast::new(
                logical_source.to_string(),
                group.len(),
                self.config.channel_capacity,
            ));
            let datatypes = source.datatype_lookup(logical_source);

            for mapper in group {
                let records = match multicast.subscribe() {
                    Ok(records) => records,
                    Err(e) => return MappingStream::failed(e),
                };
                let arrivals = ArrivalGuard {
                    as_child: as_child.remove(mapper.id()).unwrap_or_default(),
                    as_parent: as_parent.remove(mapper.id()).unwrap_or_default(),
                };
                let span = tracing::debug_span!("rml_triples_map", triples_map = %mapper.id());
                let consumer = Consumer {
                    output: emits(mapper.id()).then(|| tx.clone()),
                    errors: tx.clone(),
                    mapper: Arc::clone(mapper),
                    datatypes: Arc::clone(&datatypes),
                    blocking: Arc::clone(&blocking),
                };
                tasks.spawn(consumer.run(records, arrivals).instrument(span));
            }

            let source = Arc::clone(&source);
            let logical_source = logical_source.clone();
            let span = tracing::debug_span!("rml_source", source = %logical_source);
            tasks.spawn(
                async move {
                    let records = match source.open(&logical_source).await {
                        Ok(records) => records,
                        Err(e) => futures_stream::iter([Err(e)]).boxed(),
                    };
                    multicast.run(records).await;
                }
                .instrument(span),
            );
        }

        MappingStream::new(rx, tasks)
    }
}

/// Arrives at a mapper's barriers when its consumer ends, however it ends
struct ArrivalGuard {
    as_child: Vec<Arc<JoinBarrier>>,
    as_parent: Vec<Arc<JoinBarrier>>,
}

impl Drop for ArrivalGuard {
    fn drop(&mut self) {
        for barrier in &self.as_child {
            barrier.arrive_child();
        }
        for barrier in &self.as_parent {
            barrier.arrive_parent();
        }
    }
}

struct Consumer {
    mapper: Arc<TriplesMapper>,
    datatypes: Arc<dyn DatatypeLookup>,
    blocking: Arc<Semaphore>,
    /// `None` when the triples map's statements are not wanted
    output: Option<Output>,
    errors: Output,
}

impl Consumer {
    async fn run(self, mut records: RecordReceiver, _arrivals: ArrivalGuard) {
        let id = Arc::clone(self.mapper.id());
        let blocking = self.mapper.requires_blocking();
        let mut mapped = 0usize;
        let mut emitted = 0usize;

        while let Some(item) = records.recv().await {
            let result = match item {
                Ok(record) => self.map_record(record, blocking).await,
                Err(e) => Err(e),
            };
            let statements = match result {
                Ok(statements) => statements,
                Err(e) => {
                    let _ = self.errors.send(Err(e.in_triples_map(&*id))).await;
                    return;
                }
            };
            mapped += 1;

            if let Some(output) = &self.output {
                for statement in statements {
                    let item = MappedStatement {
                        triples_map: Arc::clone(&id),
                        statement,
                    };
                    if output.send(Ok(item)).await.is_err() {
                        return;
                    }
                    emitted += 1;
                }
            }
        }

        debug!(records = mapped, statements = emitted, "triples map finished");
    }

    async fn map_record(&self, record: Record, blocking: bool) -> RmlResult<Vec<Statement>> {
        if !blocking {
            return self.mapper.map_record(&*record, &*self.datatypes);
        }

        let _permit = self
            .blocking
            .acquire()
            .await
            .map_err(|_| RmlError::Internal("blocking evaluation pool closed".to_string()))?;
        let mapper = Arc::clone(&self.mapper);
        let datatypes = Arc::clone(&self.datatypes);
        tokio::task::spawn_blocking(move || mapper.map_record(&*record, &*datatypes))
            .await
            .map_err(|e| RmlError::Internal(format!("blocking mapping task failed: {e}")))?
    }
}

async fn resolve_join(
    rom: Arc<RefObjectMapper>,
    parent: Arc<TriplesMapper>,
    barrier: Arc<JoinBarrier>,
    output: Option<Output>,
) {
    barrier.wait().await;

    let statements = match parent.join_index() {
        Some(index) => rom.resolve(index),
        None => Vec::new(),
    };
    debug!(statements = statements.len(), "join resolved");

    if let Some(output) = output {
        for statement in statements {
            let item = MappedStatement {
                triples_map: Arc::clone(rom.child_triples_map()),
                statement,
            };
            if output.send(Ok(item)).await.is_err() {
                break;
            }
        }
    }

    if parent.notify_completion(rom.key()) {
        debug!(parent = %parent.id(), "last dependent resolved");
    }
}
