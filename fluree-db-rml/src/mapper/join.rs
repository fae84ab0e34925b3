//! Join state shared between child and parent triples maps
//!
//! - [`ChildSideJoinStore`]: per ref-object map, entries captured from child
//!   records, drained once when the join resolves.
//! - [`ParentSideJoinIndex`]: per parent triples map, `(reference, value)` to
//!   subjects, filled while parent records are mapped.
//! - [`CompletionTracker`]: counts the ref-object maps still reading a parent
//!   index so it can be released after the last one.
//! - [`JoinBarrier`]: opens once both the child and the parent streams ended.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use indexmap::IndexSet;
use parking_lot::{Mutex, RwLock};
use tokio::sync::Notify;

use crate::term::RdfTerm;

/// One join condition evaluated against a child record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildJoinCondition {
    pub child_reference: String,
    /// Lexical values of `child_reference` for the record (never empty)
    pub child_values: Vec<String>,
    pub parent_reference: String,
}

/// A pending join captured from one child record
#[derive(Debug, Clone)]
pub struct ChildSideJoin {
    pub subjects: IndexSet<RdfTerm>,
    pub predicates: IndexSet<RdfTerm>,
    /// `None` is the default graph
    pub graphs: IndexSet<Option<RdfTerm>>,
    pub conditions: Vec<ChildJoinCondition>,
}

/// Child-side join store
#[derive(Debug, Default)]
pub struct ChildSideJoinStore {
    entries: Mutex<Vec<ChildSideJoin>>,
}

impl ChildSideJoinStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a captured entry
    pub fn add(&self, join: ChildSideJoin) {
        self.entries.lock().push(join);
    }

    /// Take every entry captured so far, leaving the store empty
    pub fn drain(&self) -> Vec<ChildSideJoin> {
        std::mem::take(&mut *self.entries.lock())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// Parent-side join index
///
/// Inserting a key that already exists unions the subject sets.
#[derive(Debug, Default)]
pub struct ParentSideJoinIndex {
    entries: RwLock<HashMap<String, HashMap<String, IndexSet<RdfTerm>>>>,
}

impl ParentSideJoinIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `subjects` have `value` for `reference`
    pub fn insert(&self, reference: &str, value: String, subjects: &IndexSet<RdfTerm>) {
        self.entries
            .write()
            .entry(reference.to_string())
            .or_default()
            .entry(value)
            .or_default()
            .extend(subjects.iter().cloned());
    }

    /// Subjects recorded for `(reference, value)`
    pub fn lookup(&self, reference: &str, value: &str) -> Option<IndexSet<RdfTerm>> {
        self.entries
            .read()
            .get(reference)
            .and_then(|by_value| by_value.get(value))
            .cloned()
    }

    /// Drop every entry
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        entries.clear();
        entries.shrink_to_fit();
    }

    /// Number of `(reference, value)` keys
    pub fn len(&self) -> usize {
        self.entries.read().values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Tracks which dependent ref-object maps are done with a parent index
#[derive(Debug)]
pub struct CompletionTracker {
    dependents: HashMap<Arc<str>, AtomicBool>,
    remaining: AtomicUsize,
}

impl CompletionTracker {
    /// Create a tracker for the given dependent keys
    pub fn new(keys: impl IntoIterator<Item = Arc<str>>) -> Self {
        let dependents: HashMap<Arc<str>, AtomicBool> = keys
            .into_iter()
            .map(|key| (key, AtomicBool::new(false)))
            .collect();
        let remaining = AtomicUsize::new(dependents.len());
        Self {
            dependents,
            remaining,
        }
    }

    /// Mark a dependent as done
    ///
    /// Returns true only for the notification that completes the last
    /// dependent. Unknown keys and repeated notifications return false.
    pub fn notify(&self, key: &str) -> bool {
        let Some(flag) = self.dependents.get(key) else {
            return false;
        };
        if flag.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.remaining.fetch_sub(1, Ordering::AcqRel) == 1
    }

    /// Dependents that have not notified yet
    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    pub fn is_complete(&self) -> bool {
        self.remaining() == 0
    }
}

/// Two-party barrier between a child stream and its parent stream
#[derive(Debug, Default)]
pub struct JoinBarrier {
    child_done: AtomicBool,
    parent_done: AtomicBool,
    arrived: AtomicUsize,
    notify: Notify,
}

impl JoinBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    /// The child stream has ended
    pub fn arrive_child(&self) {
        self.arrive(&self.child_done);
    }

    /// The parent stream has ended
    pub fn arrive_parent(&self) {
        self.arrive(&self.parent_done);
    }

    fn arrive(&self, side: &AtomicBool) {
        if side.swap(true, Ordering::AcqRel) {
            return;
        }
        if self.arrived.fetch_add(1, Ordering::AcqRel) == 1 {
            self.notify.notify_waiters();
        }
    }

    /// Check whether both sides have arrived
    pub fn is_open(&self) -> bool {
        self.arrived.load(Ordering::Acquire) >= 2
    }

    /// Wait until both sides have arrived
    pub async fn wait(&self) {
        loop {
            // Registered before the check so a concurrent open is not missed
            let notified = self.notify.notified();
            if self.is_open() {
                return;
            }
            notified.await;
        }
    }
}
