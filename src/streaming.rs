//! Folds a server-streaming RPC into the batch semantics every Stream data
//! call needs, and bridges that push-style shape into a blocking pull-style
//! call for callers that want one.
//!
//! `tonic::Streaming<T>` already plays the role of the completion loop: each
//! poll is one completion, `Ok(Some(item))` is an OK completion, `Ok(None)`
//! is the notifier returning false (shutdown), and `Err(status)` is a
//! transport failure. `StreamPump` is generic over anything shaped like that
//! stream, so it drives the exact state table every streaming data call is
//! specified to follow without depending on a live gRPC connection: the
//! first zero-length batch is metadata and must never reach the caller as
//! end-of-stream, and the terminal batch is delivered exactly once.

use tokio_stream::{Stream, StreamExt};
use wire::{proto, Status};

/// One delivery from a `StreamPump`: either a non-terminal batch of values,
/// or the single terminal delivery that ends the stream.
pub struct Batch<V> {
    pub values: Vec<V>,
    pub version: u64,
    pub finished: bool,
    pub status: Status,
}

impl<V> Batch<V> {
    fn terminal(status: Status, version: u64) -> Self {
        Self {
            values: Vec::new(),
            version,
            finished: true,
            status,
        }
    }
}

/// Drives one response stream through the metadata/data/terminal state
/// machine. `T` is a generated response type carrying an `Option<proto::Status>`
/// and zero or more domain values; `extract` pulls those two things out
/// without this type needing to know which RPC it's driving.
pub struct StreamPump<S> {
    inner: S,
    seen_metadata: bool,
    last_version: u64,
    done: bool,
}

impl<T, S> StreamPump<S>
where
    S: Stream<Item = Result<T, tonic::Status>> + Unpin,
{
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            seen_metadata: false,
            last_version: 0,
            done: false,
        }
    }

    /// Pull the next batch. Once a terminal batch has been returned, every
    /// subsequent call returns the same terminal batch again rather than
    /// polling the underlying stream.
    pub async fn next_batch<V>(
        &mut self,
        extract: impl Fn(T) -> (Vec<V>, u64, Option<proto::Status>),
    ) -> Batch<V> {
        if self.done {
            return Batch::terminal(Status::Ok, self.last_version);
        }

        loop {
            match self.inner.next().await {
                None => {
                    self.done = true;
                    return Batch::terminal(Status::Ok, self.last_version);
                }
                Some(Err(transport_err)) => {
                    self.done = true;
                    return Batch::terminal(Status::from(transport_err), self.last_version);
                }
                Some(Ok(item)) => {
                    let (values, version, stat) = extract(item);
                    self.last_version = version;
                    let status = Status::from_stat(stat);

                    if status.is_error() {
                        self.done = true;
                        return Batch::terminal(status, version);
                    }

                    if values.is_empty() {
                        if self.seen_metadata {
                            self.done = true;
                            return Batch::terminal(Status::Ok, version);
                        }
                        self.seen_metadata = true;
                        continue;
                    }

                    self.seen_metadata = true;
                    return Batch {
                        values,
                        version,
                        finished: false,
                        status: Status::Ok,
                    };
                }
            }
        }
    }
}

/// Drain a `StreamPump` to completion, calling `on_batch` for every
/// non-terminal batch and returning the status observed on the terminal
/// delivery.
pub async fn drain_to_callback<T, S, V>(
    pump: &mut StreamPump<S>,
    extract: impl Fn(T) -> (Vec<V>, u64, Option<proto::Status>),
    mut on_batch: impl FnMut(Vec<V>, u64),
) -> Status
where
    S: Stream<Item = Result<T, tonic::Status>> + Unpin,
{
    loop {
        let batch = pump.next_batch(&extract).await;
        if batch.finished {
            return batch.status;
        }
        on_batch(batch.values, batch.version);
    }
}

/// Drain a `StreamPump` into a caller-provided vector, recording the
/// last-seen version, mirroring the "sync-collect" API surface.
pub async fn drain_to_vec<T, S, V>(
    pump: &mut StreamPump<S>,
    extract: impl Fn(T) -> (Vec<V>, u64, Option<proto::Status>),
    out: &mut Vec<V>,
    version: &mut u64,
) -> Status
where
    S: Stream<Item = Result<T, tonic::Status>> + Unpin,
{
    drain_to_callback(pump, extract, |mut values, v| {
        *version = v;
        out.append(&mut values);
    })
    .await
}
