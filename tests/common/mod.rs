//! Shared fakes for the poller tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use quick_xml::escape::escape;
use tokio::sync::mpsc::UnboundedReceiver;

use sqs_reader::app::StopHandle;
use sqs_reader::errors::ReaderError;
use sqs_reader::ingest::{ResponseBody, SignedGet};

pub const ENDPOINT: &str = "https://sqs.us-east-1.amazonaws.com/123456789012/lines?";

/// Build a ReceiveMessage response shaped like the real service's.
pub fn receive_xml(messages: &[(&str, &str)]) -> String {
    let mut s = String::from(
        r#"<?xml version="1.0"?><ReceiveMessageResponse xmlns="http://queue.amazonaws.com/doc/2012-11-05/"><ReceiveMessageResult>"#,
    );
    for (i, (body, handle)) in messages.iter().enumerate() {
        s.push_str(&format!(
            "<Message><MessageId>id-{i}</MessageId><ReceiptHandle>{}</ReceiptHandle>\
             <MD5OfBody>0</MD5OfBody><Body>{}</Body>\
             <Attribute><Name>SenderId</Name><Value>AIDA</Value></Attribute>\
             <Attribute><Name>ApproximateReceiveCount</Name><Value>1</Value></Attribute></Message>",
            escape(*handle),
            escape(*body)
        ));
    }
    s.push_str(
        "</ReceiveMessageResult><ResponseMetadata><RequestId>req-1</RequestId></ResponseMetadata></ReceiveMessageResponse>",
    );
    s
}

pub enum FetchReply {
    Xml(String),
    TransportError,
    ReadError,
}

pub struct FakeBody(Result<Bytes, ReaderError>);

#[async_trait]
impl ResponseBody for FakeBody {
    async fn read_all(self) -> Result<Bytes, ReaderError> {
        self.0
    }
}

/// Scripted queue. Once the script runs dry it stops the poller and answers
/// with an empty batch, so `start()` always terminates.
#[derive(Clone, Default)]
pub struct FakeQueue {
    pub script: Arc<Mutex<VecDeque<FetchReply>>>,
    pub requests: Arc<Mutex<Vec<String>>>,
    pub fail_delete: bool,
    /// Request a stop while serving this (1-indexed) fetch.
    pub stop_on_fetch: Option<usize>,
    pub stop: Arc<Mutex<Option<StopHandle>>>,
}

impl FakeQueue {
    pub fn with_script(replies: Vec<FetchReply>) -> Self {
        Self {
            script: Arc::new(Mutex::new(replies.into())),
            ..Default::default()
        }
    }

    pub fn attach(&self, handle: StopHandle) {
        *self.stop.lock().unwrap() = Some(handle);
    }

    pub fn fetches(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.contains("Action=ReceiveMessage"))
            .cloned()
            .collect()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.contains("Action=DeleteMessageBatch"))
            .cloned()
            .collect()
    }

    fn request_stop(&self) {
        if let Some(h) = self.stop.lock().unwrap().as_ref() {
            h.stop();
        }
    }
}

#[async_trait]
impl SignedGet for FakeQueue {
    type Response = FakeBody;

    async fn get(&self, url: &str) -> Result<FakeBody, ReaderError> {
        self.requests.lock().unwrap().push(url.to_string());

        if url.contains("Action=DeleteMessageBatch") {
            if self.fail_delete {
                return Err(ReaderError::Transport("connection reset".into()));
            }
            return Ok(FakeBody(Ok(Bytes::from_static(b"<DeleteMessageBatchResponse/>"))));
        }

        if Some(self.fetches().len()) == self.stop_on_fetch {
            self.request_stop();
        }
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(FetchReply::Xml(xml)) => Ok(FakeBody(Ok(Bytes::from(xml)))),
            Some(FetchReply::TransportError) => Err(ReaderError::Transport("dns failure".into())),
            Some(FetchReply::ReadError) => Ok(FakeBody(Err(ReaderError::Read("body truncated".into())))),
            None => {
                self.request_stop();
                Ok(FakeBody(Ok(Bytes::from(receive_xml(&[])))))
            }
        }
    }
}

/// `(name, value)` query pairs of a request URL, in order.
pub fn query_pairs(url: &str) -> Vec<(String, String)> {
    url::Url::parse(url)
        .expect("valid url")
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// `(Id, ReceiptHandle)` entries of a DeleteMessageBatch URL.
pub fn delete_entries(url: &str) -> Vec<(String, String)> {
    let pairs = query_pairs(url);
    let mut out = Vec::new();
    for n in 1.. {
        let id_key = format!("DeleteMessageBatchRequestEntry.{n}.Id");
        let rh_key = format!("DeleteMessageBatchRequestEntry.{n}.ReceiptHandle");
        let id = pairs.iter().find(|(k, _)| *k == id_key).map(|(_, v)| v.clone());
        let rh = pairs.iter().find(|(k, _)| *k == rh_key).map(|(_, v)| v.clone());
        match (id, rh) {
            (Some(id), Some(rh)) => out.push((id, rh)),
            _ => break,
        }
    }
    out
}

pub fn drain(rx: &mut UnboundedReceiver<Bytes>) -> Vec<String> {
    let mut out = Vec::new();
    while let Ok(line) = rx.try_recv() {
        out.push(String::from_utf8(line.to_vec()).expect("utf8"));
    }
    out
}
