//! HTTP layer. Every outbound request passes through here.
//!
//! ARCHITECTURAL RULE: service operations never talk to a transport directly.
//! They are built with an [`HttpClient`], which records diagnostics for every
//! failed or erroring exchange before handing the outcome back unchanged.

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::diagnostics::{
    preview_body, DiagnosticRecord, Diagnostics, RequestSnapshot, ResponseSnapshot,
};
use crate::errors::TransportError;

pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use transport::{ReqwestTransport, Transport};

#[derive(Debug, Clone)]
pub enum PartValue {
    Text(String),
    File {
        filename: String,
        content_type: String,
        bytes: Bytes,
    },
}

#[derive(Debug, Clone)]
pub struct FormPart {
    pub name: String,
    pub value: PartValue,
}

/// An ordered multipart form. Field names may repeat.
#[derive(Debug, Clone, Default)]
pub struct MultipartForm {
    parts: Vec<FormPart>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(FormPart {
            name: name.into(),
            value: PartValue::Text(value.into()),
        });
        self
    }

    pub fn file(
        mut self,
        name: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        self.parts.push(FormPart {
            name: name.into(),
            value: PartValue::File {
                filename: filename.into(),
                content_type: content_type.into(),
                bytes: bytes.into(),
            },
        });
        self
    }

    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }

    /// Number of parts named exactly `name`.
    pub fn count(&self, name: &str) -> usize {
        self.parts.iter().filter(|p| p.name == name).count()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.count(name) > 0
    }
}

#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    /// Serialized JSON text.
    Json(String),
    Multipart(MultipartForm),
}

/// A fully described outbound call. Header names are stored lowercase.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: BTreeMap<String, String>,
    pub body: RequestBody,
}

impl OutboundRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: BTreeMap::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: Url) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Declares `accept: application/json`.
    pub fn accept_json(self) -> Self {
        self.header("accept", "application/json")
    }

    /// Sets a JSON body along with the matching content type.
    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body.to_string());
        self.header("content-type", "application/json")
    }

    pub fn multipart(mut self, form: MultipartForm) -> Self {
        self.body = RequestBody::Multipart(form);
        self
    }

    pub fn bearer(self, authorization: Option<String>) -> Self {
        match authorization {
            Some(value) => self.header("authorization", value),
            None => self,
        }
    }

    fn snapshot(&self) -> RequestSnapshot {
        let body_preview = match (&self.body, self.method.as_str()) {
            (_, "GET" | "HEAD") => None,
            (RequestBody::Json(text), _) => Some(preview_body(text)),
            _ => None,
        };
        let mut headers = self.headers.clone();
        // The transport adds the multipart content type with its boundary.
        if matches!(self.body, RequestBody::Multipart(_)) {
            headers
                .entry("content-type".to_string())
                .or_insert_with(|| "multipart/form-data".to_string());
        }
        RequestSnapshot {
            url: self.url.to_string(),
            method: self.method.to_string(),
            headers,
            body_preview,
        }
    }
}

/// A settled response with its body fully buffered, so both the caller and
/// the diagnostics capture can read it.
#[derive(Debug, Clone)]
pub struct InboundResponse {
    pub status: StatusCode,
    pub headers: BTreeMap<String, String>,
    /// `None` when the body could not be read.
    pub body: Option<Bytes>,
}

impl InboundResponse {
    pub fn new(status: StatusCode, headers: BTreeMap<String, String>, body: Option<Bytes>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn status_text(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or("")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn text(&self) -> Option<String> {
        self.body
            .as_ref()
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }

    /// Parses the body as JSON, returning `fallback` if it is missing or malformed.
    pub fn json_or(&self, fallback: Value) -> Value {
        self.body
            .as_ref()
            .and_then(|b| serde_json::from_slice(b).ok())
            .unwrap_or(fallback)
    }

    fn snapshot(&self) -> ResponseSnapshot {
        ResponseSnapshot {
            ok: self.is_success(),
            status: self.status.as_u16(),
            status_text: self.status_text().to_string(),
            headers: self.headers.clone(),
            body_text: self.text(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    FailuresOnly,
    Always,
}

/// The shared, diagnostics-recording client every operation is built with.
#[derive(Clone)]
pub struct HttpClient {
    transport: Arc<dyn Transport>,
    diagnostics: Arc<Diagnostics>,
}

impl HttpClient {
    pub fn new(transport: Arc<dyn Transport>, diagnostics: Arc<Diagnostics>) -> Self {
        Self {
            transport,
            diagnostics,
        }
    }

    pub fn diagnostics(&self) -> &Arc<Diagnostics> {
        &self.diagnostics
    }

    /// Sends the request, recording a diagnostic only on transport failure or a non-2xx status.
    pub async fn send(&self, request: OutboundRequest) -> Result<InboundResponse, TransportError> {
        self.dispatch(request, Capture::FailuresOnly).await
    }

    /// Sends the request and records a diagnostic whatever the outcome.
    pub async fn send_recorded(
        &self,
        request: OutboundRequest,
    ) -> Result<InboundResponse, TransportError> {
        self.dispatch(request, Capture::Always).await
    }

    async fn dispatch(
        &self,
        request: OutboundRequest,
        capture: Capture,
    ) -> Result<InboundResponse, TransportError> {
        let timestamp = Utc::now();
        let snapshot = request.snapshot();
        debug!("{} {}", snapshot.method, snapshot.url);

        match self.transport.send(&request).await {
            Ok(response) => {
                if !response.is_success() || capture == Capture::Always {
                    self.diagnostics.publish(DiagnosticRecord {
                        timestamp,
                        request: snapshot,
                        response: Some(response.snapshot()),
                        error: None,
                    });
                }
                Ok(response)
            }
            Err(e) => {
                self.diagnostics.publish(DiagnosticRecord {
                    timestamp,
                    request: snapshot,
                    response: None,
                    error: Some(e.to_string()),
                });
                Err(e)
            }
        }
    }
}
