//! SQS query-API integration: signed transport, request URLs, and response parsing.

use std::time::SystemTime;

use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sigv4::http_request::{sign, SignableBody, SignableRequest, SigningParams, SigningSettings};
use aws_sigv4::sign::v4;
use aws_smithy_runtime_api::client::identity::Identity;
use bytes::Bytes;
use serde::Deserialize;
use tracing::debug;
use url::form_urlencoded;

use crate::config::Config;
use crate::errors::ReaderError;
use crate::ingest::{QueueMessage, ReceivedBatch, ResponseBody, SignedGet};

pub const API_VERSION: &str = "2012-11-05";
pub const SIGNATURE_VERSION: &str = "4";
pub const WAIT_TIME_SECONDS: u32 = 0;
pub const MAX_MESSAGES: u32 = 10;

const SERVICE_NAME: &str = "sqs";
const DEFAULT_REGION: &str = "us-east-1";

/// `reqwest` client that signs every GET with SigV4 using static keys.
#[derive(Clone)]
pub struct SignedSqsClient {
    http: reqwest::Client,
    identity: Identity,
    region: String,
}

impl SignedSqsClient {
    pub fn new(access_key: &str, secret_key: &str, region: impl Into<String>) -> Self {
        let credentials = Credentials::new(access_key, secret_key, None, None, "sqs-reader");
        Self {
            http: reqwest::Client::new(),
            identity: credentials.into(),
            region: region.into(),
        }
    }

    /// Build from config; the region falls back to the one encoded in the endpoint host.
    pub fn from_config(cfg: &Config) -> Self {
        let region = cfg
            .region
            .clone()
            .or_else(|| region_from_endpoint(&cfg.sqs_endpoint))
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        Self::new(&cfg.access_key, &cfg.secret_key, region)
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    fn signed_headers(&self, url: &str) -> Result<Vec<(String, String)>, ReaderError> {
        let params: SigningParams<'_> = v4::SigningParams::builder()
            .identity(&self.identity)
            .region(&self.region)
            .name(SERVICE_NAME)
            .time(SystemTime::now())
            .settings(SigningSettings::default())
            .build()
            .map_err(|e| ReaderError::Signing(e.to_string()))?
            .into();

        let signable = SignableRequest::new("GET", url, std::iter::empty(), SignableBody::Bytes(&[]))
            .map_err(|e| ReaderError::Signing(e.to_string()))?;
        let (instructions, _signature) = sign(signable, &params)
            .map_err(|e| ReaderError::Signing(e.to_string()))?
            .into_parts();

        Ok(instructions
            .headers()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect())
    }
}

#[async_trait]
impl SignedGet for SignedSqsClient {
    type Response = reqwest::Response;

    async fn get(&self, url: &str) -> Result<Self::Response, ReaderError> {
        let mut req = self.http.get(url);
        for (name, value) in self.signed_headers(url)? {
            req = req.header(name, value);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| ReaderError::Transport(e.to_string()))?;
        if !resp.status().is_success() {
            // SQS error documents parse to an empty batch; the loop treats them as idle.
            debug!(status = %resp.status(), "non-success status from queue");
        }
        Ok(resp)
    }
}

#[async_trait]
impl ResponseBody for reqwest::Response {
    async fn read_all(self) -> Result<Bytes, ReaderError> {
        self.bytes()
            .await
            .map_err(|e| ReaderError::Read(e.to_string()))
    }
}

/// Region from `sqs.<region>.amazonaws.com` or legacy `<region>.queue.amazonaws.com`.
pub fn region_from_endpoint(endpoint: &str) -> Option<String> {
    let parsed = url::Url::parse(endpoint).ok()?;
    let host = parsed.host_str()?;
    let labels: Vec<&str> = host.split('.').collect();
    match labels.as_slice() {
        ["sqs", region, "amazonaws", ..] => Some(region.to_string()),
        [region, "queue", "amazonaws", ..] => Some(region.to_string()),
        _ => None,
    }
}

/// Full ReceiveMessage URL for a normalized (`?`-terminated) endpoint.
pub fn receive_url(endpoint: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("Action", "ReceiveMessage")
        .append_pair("AttributeName", "All")
        .append_pair("Version", API_VERSION)
        .append_pair("SignatureVersion", SIGNATURE_VERSION)
        .append_pair("WaitTimeSeconds", &WAIT_TIME_SECONDS.to_string())
        .append_pair("MaxNumberOfMessages", &MAX_MESSAGES.to_string())
        .finish();
    format!("{endpoint}{query}")
}

/// Full DeleteMessageBatch URL; entry `i` (1-indexed) gets id `msg<i>`.
pub fn delete_batch_url<'a>(endpoint: &str, receipt_handles: impl IntoIterator<Item = &'a str>) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query
        .append_pair("Action", "DeleteMessageBatch")
        .append_pair("Version", API_VERSION)
        .append_pair("SignatureVersion", SIGNATURE_VERSION);
    for (i, handle) in receipt_handles.into_iter().enumerate() {
        let n = i + 1;
        query
            .append_pair(&format!("DeleteMessageBatchRequestEntry.{n}.Id"), &format!("msg{n}"))
            .append_pair(&format!("DeleteMessageBatchRequestEntry.{n}.ReceiptHandle"), handle);
    }
    format!("{endpoint}{}", query.finish())
}

#[derive(Debug, Deserialize)]
struct ReceiveMessageResponse {
    #[serde(rename = "ReceiveMessageResult", default)]
    result: ReceiveMessageResult,
}

#[derive(Debug, Default, Deserialize)]
struct ReceiveMessageResult {
    #[serde(rename = "Message", default)]
    messages: Vec<XmlMessage>,
}

#[derive(Debug, Deserialize)]
struct XmlMessage {
    #[serde(rename = "Body")]
    body: Option<String>,
    #[serde(rename = "ReceiptHandle")]
    receipt_handle: Option<String>,
}

/// Parse a ReceiveMessage response into aligned `(body, receipt handle)` pairs.
///
/// A `Message` missing either field breaks positional alignment; the whole
/// response is rejected rather than pairing tokens with the wrong bodies.
pub fn parse_receive_response(xml: &[u8]) -> Result<ReceivedBatch, ReaderError> {
    let text = std::str::from_utf8(xml).map_err(|e| ReaderError::Xml(e.to_string()))?;
    let doc: ReceiveMessageResponse =
        quick_xml::de::from_str(text).map_err(|e| ReaderError::Xml(e.to_string()))?;

    let raw = doc.result.messages;
    let bodies = raw.iter().filter(|m| m.body.is_some()).count();
    let receipts = raw.iter().filter(|m| m.receipt_handle.is_some()).count();

    let mut messages = Vec::with_capacity(raw.len());
    for m in raw {
        match (m.body, m.receipt_handle) {
            (Some(body), Some(receipt_handle)) => messages.push(QueueMessage { body, receipt_handle }),
            _ => return Err(ReaderError::Misaligned { bodies, receipts }),
        }
    }
    Ok(ReceivedBatch { messages })
}
