//! Error types for sqs-reader
//!
//! Overview
//! --------
//! Canonical error enumeration used across fetch, decode, and emit layers.
//! Third-party errors (reqwest, quick-xml, serde_json, aws-sigv4) are mapped
//! into these variants at module boundaries.
//!
//! Usage
//! -----
//! - The receive loop classifies each variant as iteration-abort or
//!   message-skip; none of them is fatal to the loop.
//! - `ConfigError` is only produced at startup.
//!
//! Concurrency / Logging
//! ---------------------
//! Errors are `Send + Sync` and implement Display via `thiserror`.
//! Use `tracing` for context at call sites (`warn!(...);`).
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReaderError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Network failure while sending a fetch or delete request.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The response arrived but its body could not be read.
    #[error("Response read error: {0}")]
    Read(String),

    #[error("Request signing failed: {0}")]
    Signing(String),

    /// The fetch response was not a valid ReceiveMessage document.
    #[error("Receive response parse error: {0}")]
    Xml(String),

    /// Body and ReceiptHandle sequences did not line up.
    #[error("Receive response misaligned: {bodies} bodies, {receipts} receipt handles")]
    Misaligned { bodies: usize, receipts: usize },

    /// A message body was not a usable notification envelope.
    #[error("Envelope decode error: {0}")]
    Envelope(String),

    #[error("Output sink closed")]
    SinkClosed,
}
