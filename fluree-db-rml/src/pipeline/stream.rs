//! Output stream of a mapping run

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::{RmlError, RmlResult};
use crate::term::Statement;

/// A generated statement and the triples map that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedStatement {
    pub triples_map: Arc<str>,
    pub statement: Statement,
}

/// Statements of a running mapping
///
/// Yields statements as the triples maps produce them. After the first error
/// the stream ends and every remaining task is cancelled. Dropping the stream
/// cancels the run.
#[derive(Debug)]
pub struct MappingStream {
    rx: ReceiverStream<RmlResult<MappedStatement>>,
    tasks: JoinSet<()>,
    done: bool,
}

impl MappingStream {
    pub(crate) fn new(rx: mpsc::Receiver<RmlResult<MappedStatement>>, tasks: JoinSet<()>) -> Self {
        Self {
            rx: ReceiverStream::new(rx),
            tasks,
            done: false,
        }
    }

    /// A stream that yields one error and ends
    pub(crate) fn failed(error: RmlError) -> Self {
        let (tx, rx) = mpsc::channel(1);
        let _ = tx.try_send(Err(error));
        Self::new(rx, JoinSet::new())
    }

    /// Drain the stream into a vector, stopping at the first error
    pub async fn collect_statements(mut self) -> RmlResult<Vec<Statement>> {
        let mut out = Vec::new();
        while let Some(item) = self.next().await {
            out.push(item?.statement);
        }
        Ok(out)
    }

    fn finish(&mut self) {
        self.done = true;
        self.tasks.abort_all();
    }
}

impl Stream for MappingStream {
    type Item = RmlResult<MappedStatement>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }

        match this.rx.poll_next_unpin(cx) {
            Poll::Ready(Some(Err(e))) => {
                this.finish();
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(Some(ok)) => Poll::Ready(Some(ok)),
            Poll::Pending => Poll::Pending,
            // Every sender is gone; surface a panicked task, if any
            Poll::Ready(None) => loop {
                match this.tasks.poll_join_next(cx) {
                    Poll::Ready(Some(Ok(()))) => continue,
                    Poll::Ready(Some(Err(e))) if e.is_panic() => {
                        this.finish();
                        return Poll::Ready(Some(Err(RmlError::Internal(format!(
                            "mapping task panicked: {e}"
                        )))));
                    }
                    Poll::Ready(Some(Err(_))) => continue,
                    Poll::Ready(None) => {
                        this.done = true;
                        return Poll::Ready(None);
                    }
                    Poll::Pending => return Poll::Pending,
                }
            },
        }
    }
}
