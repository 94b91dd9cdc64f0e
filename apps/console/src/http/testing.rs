use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use serde_json::Value;

use super::{InboundResponse, OutboundRequest, Transport};
use crate::errors::TransportError;

/// Replays queued replies in order and remembers every request it was handed.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<InboundResponse, TransportError>>>,
    requests: Mutex<Vec<OutboundRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, response: InboundResponse) {
        self.replies.lock().unwrap().push_back(Ok(response));
    }

    pub fn reply_json(&self, status: u16, body: Value) {
        self.reply_text(status, &body.to_string());
    }

    pub fn reply_text(&self, status: u16, body: &str) {
        self.reply_with_headers(status, &[], body);
    }

    pub fn reply_with_headers(&self, status: u16, headers: &[(&str, &str)], body: &str) {
        let headers: BTreeMap<String, String> = headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.reply(InboundResponse::new(
            StatusCode::from_u16(status).unwrap(),
            headers,
            Some(Bytes::from(body.to_string())),
        ));
    }

    pub fn reply_error(&self, message: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(TransportError(message.to_string())));
    }

    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &OutboundRequest) -> Result<InboundResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError("no scripted reply".to_string())))
    }
}
