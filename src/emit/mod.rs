//! Output sinks for decoded payload lines.
//!
//! The poller owns the sending side; the consumer owns the receiver. A full
//! bounded channel blocks the poller, a dropped receiver ends it.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc::{Sender, UnboundedSender};

use crate::errors::ReaderError;

#[async_trait]
pub trait LineSink: Send + Sync {
    /// Deliver one line. Fails only when the consumer is gone.
    async fn send_line(&self, line: Bytes) -> Result<(), ReaderError>;
}

#[async_trait]
impl LineSink for Sender<Bytes> {
    async fn send_line(&self, line: Bytes) -> Result<(), ReaderError> {
        self.send(line).await.map_err(|_| ReaderError::SinkClosed)
    }
}

#[async_trait]
impl LineSink for UnboundedSender<Bytes> {
    async fn send_line(&self, line: Bytes) -> Result<(), ReaderError> {
        self.send(line).map_err(|_| ReaderError::SinkClosed)
    }
}
