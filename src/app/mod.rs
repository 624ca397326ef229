//! App runtime: the fetch → decode → emit → delete loop (hot path).
//!
//! Retry policy
//! ------------
//! Every fetch, read, parse, and delete failure abandons only the current
//! iteration; the next iteration starts immediately with a fresh fetch. There
//! is no backoff and no attempt limit. The loop ends when the stop token is
//! cancelled, either by a `stop()` caller or because the sink's consumer went
//! away. Cancellation is observed only between iterations.

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::emit::LineSink;
use crate::errors::ReaderError;
use crate::ingest::{ReceivedBatch, ResponseBody, SignedGet};
use crate::sqs::{delete_batch_url, receive_url};
use crate::transform::decode::{decode_envelope, payload_lines};

/// Where an abandoned iteration gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Read,
    Parse,
}

/// What one iteration did. Returned for observability only; the loop's
/// control flow never depends on anything but `SinkClosed`.
#[derive(Debug)]
pub enum IterationOutcome {
    /// The queue returned no messages.
    Empty,
    /// Nothing emitted, nothing deleted.
    Aborted { stage: Stage, error: ReaderError },
    /// Every fetched message was offered to the sink and a delete was sent.
    Acknowledged {
        messages: usize,
        emitted: usize,
        skipped: usize,
        delete_failed: bool,
    },
    /// The consumer dropped the sink mid-iteration; the batch was not deleted.
    SinkClosed { messages: usize, emitted: usize },
}

/// Cloneable handle that cancels a running [`Poller`].
#[derive(Debug, Clone)]
pub struct StopHandle(CancellationToken);

impl StopHandle {
    /// Idempotent and non-blocking.
    pub fn stop(&self) {
        self.0.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.0.is_cancelled()
    }

    /// Resolves once a stop has been requested.
    pub async fn stopped(&self) {
        self.0.cancelled().await
    }
}

pub struct Poller<C, S> {
    client: C,
    endpoint: String,
    receive_url: String,
    sink: S,
    cancel: CancellationToken,
}

impl<C, S> Poller<C, S>
where
    C: SignedGet,
    S: LineSink,
{
    /// `endpoint` must already end with `?` (see `config::normalize_endpoint`).
    pub fn new(client: C, endpoint: &str, sink: S) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
            receive_url: receive_url(endpoint),
            sink,
            cancel: CancellationToken::new(),
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(self.cancel.clone())
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Run until stopped. Intended for a single caller.
    pub async fn start(&self) {
        info!(endpoint = %self.endpoint, "poller starting");
        while !self.cancel.is_cancelled() {
            match self.poll_once().await {
                IterationOutcome::Empty => {}
                IterationOutcome::Aborted { stage, error } => {
                    warn!(?stage, err = %error, "iteration abandoned");
                }
                IterationOutcome::Acknowledged {
                    messages,
                    emitted,
                    skipped,
                    delete_failed,
                } => {
                    debug!(messages, emitted, skipped, delete_failed, "iteration complete");
                }
                IterationOutcome::SinkClosed { messages, emitted } => {
                    info!(messages, emitted, "sink closed; stopping without delete");
                    self.cancel.cancel();
                }
            }
        }
        info!("poller stopped");
    }

    /// One fetch → decode → emit → delete cycle.
    pub async fn poll_once(&self) -> IterationOutcome {
        let batch = match self.fetch().await {
            Ok(b) => b,
            Err((stage, error)) => return IterationOutcome::Aborted { stage, error },
        };
        if batch.is_empty() {
            return IterationOutcome::Empty;
        }

        let mut emitted = 0usize;
        let mut skipped = 0usize;
        for (idx, msg) in batch.messages.iter().enumerate() {
            let payload = match decode_envelope(&msg.body) {
                Ok(p) => p,
                Err(e) => {
                    // Still acknowledged below; this message is dropped.
                    debug!(idx, err = %e, "skipping undecodable message");
                    skipped += 1;
                    continue;
                }
            };
            for line in payload_lines(&payload) {
                if self.sink.send_line(Bytes::copy_from_slice(line.as_bytes())).await.is_err() {
                    return IterationOutcome::SinkClosed {
                        messages: batch.len(),
                        emitted,
                    };
                }
                emitted += 1;
            }
        }

        let delete_failed = !self.delete(&batch).await;
        IterationOutcome::Acknowledged {
            messages: batch.len(),
            emitted,
            skipped,
            delete_failed,
        }
    }

    async fn fetch(&self) -> Result<ReceivedBatch, (Stage, ReaderError)> {
        let resp = self
            .client
            .get(&self.receive_url)
            .await
            .map_err(|e| (Stage::Fetch, e))?;
        let body = resp.read_all().await.map_err(|e| (Stage::Read, e))?;
        crate::sqs::parse_receive_response(&body).map_err(|e| (Stage::Parse, e))
    }

    /// Deletes every receipt handle in the batch. The response body is ignored.
    async fn delete(&self, batch: &ReceivedBatch) -> bool {
        let url = delete_batch_url(&self.endpoint, batch.receipt_handles());
        match self.client.get(&url).await {
            Ok(_resp) => true,
            Err(e) => {
                warn!(count = batch.len(), err = %e, "delete batch failed");
                false
            }
        }
    }
}
