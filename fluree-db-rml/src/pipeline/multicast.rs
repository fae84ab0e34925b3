//! Record multicast
//!
//! A logical source is read once per mapping run and every record is handed
//! to each triples map bound to it. Emission waits until all expected
//! consumers have subscribed, so no consumer misses the first records.

use std::sync::Arc;

use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::error::{RmlError, RmlResult};
use crate::source::{Record, RecordStream};

/// Receiving end handed to one consumer
pub type RecordReceiver = mpsc::Receiver<RmlResult<Record>>;

/// Fans one record stream out to a fixed number of consumers
#[derive(Debug)]
pub struct RecordMulticast {
    source_name: String,
    expected: usize,
    capacity: usize,
    senders: Mutex<Vec<mpsc::Sender<RmlResult<Record>>>>,
    subscribed: watch::Sender<usize>,
}

impl RecordMulticast {
    /// Create a multicast for `expected` consumers, each with a bounded queue
    pub fn new(source_name: impl Into<String>, expected: usize, capacity: usize) -> Self {
        let (subscribed, _) = watch::channel(0);
        Self {
            source_name: source_name.into(),
            expected,
            capacity: capacity.max(1),
            senders: Mutex::new(Vec::with_capacity(expected)),
            subscribed,
        }
    }

    /// Register a consumer
    ///
    /// Fails once the expected number of consumers has subscribed.
    pub fn subscribe(&self) -> RmlResult<RecordReceiver> {
        let mut senders = self.senders.lock();
        if *self.subscribed.borrow() >= self.expected {
            return Err(RmlError::Internal(format!(
                "source {} already has its {} subscribers",
                self.source_name, self.expected
            )));
        }
        let (tx, rx) = mpsc::channel(self.capacity);
        senders.push(tx);
        self.subscribed.send_replace(senders.len());
        Ok(rx)
    }

    /// Consumers subscribed so far
    pub fn subscriber_count(&self) -> usize {
        *self.subscribed.borrow()
    }

    /// Forward every record to every consumer
    ///
    /// Starts once all expected consumers have subscribed. A source error is
    /// delivered to every consumer and ends the run. Consumers that hang up
    /// are dropped; reading stops when none are left. Returns the number of
    /// records forwarded.
    pub async fn run(self: Arc<Self>, mut records: RecordStream) -> usize {
        let mut ready = self.subscribed.subscribe();
        if ready.wait_for(|n| *n >= self.expected).await.is_err() {
            return 0;
        }
        let mut senders = std::mem::take(&mut *self.senders.lock());

        let mut forwarded = 0;
        while let Some(item) = records.next().await {
            match item {
                Ok(record) => {
                    let mut open = Vec::with_capacity(senders.len());
                    for tx in senders.drain(..) {
                        if tx.send(Ok(Arc::clone(&record))).await.is_ok() {
                            open.push(tx);
                        }
                    }
                    senders = open;
                    if senders.is_empty() {
                        debug!(source = %self.source_name, "all consumers hung up");
                        break;
                    }
                    forwarded += 1;
                }
                Err(e) => {
                    warn!(source = %self.source_name, error = %e, "record source failed");
                    for tx in &senders {
                        let _ = tx.send(Err(self.share_error(&e))).await;
                    }
                    break;
                }
            }
        }

        debug!(source = %self.source_name, records = forwarded, "source exhausted");
        forwarded
    }

    /// One copy of a source error per consumer
    fn share_error(&self, error: &RmlError) -> RmlError {
        match error {
            RmlError::Source {
                source_name,
                message,
            } => RmlError::Source {
                source_name: source_name.clone(),
                message: message.clone(),
            },
            other => RmlError::Source {
                source_name: self.source_name.clone(),
                message: other.to_string(),
            },
        }
    }
}
