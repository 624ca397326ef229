//! Ingest abstraction
//!
//! Overview
//! --------
//! Minimal traits representing the authenticated transport the poller fetches
//! and acknowledges through. The concrete implementation signs requests for
//! SQS (`crate::sqs::SignedSqsClient`); tests substitute scripted fakes.

use crate::errors::ReaderError;
use bytes::Bytes;

/// One fetched message: opaque body plus the token needed to delete it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub body: String,
    pub receipt_handle: String,
}

/// Messages returned by a single fetch, in service order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceivedBatch {
    pub messages: Vec<QueueMessage>,
}

impl ReceivedBatch {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn receipt_handles(&self) -> impl Iterator<Item = &str> {
        self.messages.iter().map(|m| m.receipt_handle.as_str())
    }
}

/// A response whose body has not been read yet. Dropping it closes the body.
#[async_trait::async_trait]
pub trait ResponseBody: Send {
    async fn read_all(self) -> Result<Bytes, ReaderError>;
}

/// Authenticated GET against a fully formed URL (query string embedded).
#[async_trait::async_trait]
pub trait SignedGet: Send + Sync {
    type Response: ResponseBody;

    async fn get(&self, url: &str) -> Result<Self::Response, ReaderError>;
}
