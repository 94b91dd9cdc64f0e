use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use tracing::debug;

use super::{InboundResponse, MultipartForm, OutboundRequest, PartValue, RequestBody};
use crate::errors::TransportError;

const USER_AGENT: &str = concat!("jobscv-console/", env!("CARGO_PKG_VERSION"));

/// The network primitive underneath [`super::HttpClient`].
/// Implement this to swap the wire without touching any operation.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &OutboundRequest) -> Result<InboundResponse, TransportError>;
}

/// Transport over a shared reqwest client. No cookie store is configured,
/// so no ambient credentials are ever sent.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// `timeout` of `None` leaves requests running until the connection itself gives up.
    pub fn new(timeout: Option<Duration>) -> Result<Self, TransportError> {
        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &OutboundRequest) -> Result<InboundResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(text) => builder.body(text.clone()),
            RequestBody::Multipart(form) => builder.multipart(to_reqwest_form(form)?),
        };

        let response = builder.send().await?;
        let status = response.status();
        let headers = flatten_headers(response.headers());
        let body = match response.bytes().await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                debug!("Could not read response body from {}: {e}", request.url);
                None
            }
        };

        Ok(InboundResponse::new(status, headers, body))
    }
}

fn to_reqwest_form(form: &MultipartForm) -> Result<Form, TransportError> {
    let mut out = Form::new();
    for part in form.parts() {
        out = match &part.value {
            PartValue::Text(value) => out.text(part.name.clone(), value.clone()),
            PartValue::File {
                filename,
                content_type,
                bytes,
            } => {
                let file = Part::bytes(bytes.to_vec())
                    .file_name(filename.clone())
                    .mime_str(content_type)?;
                out.part(part.name.clone(), file)
            }
        };
    }
    Ok(out)
}

/// Lowercased header names; repeated headers are joined with ", ".
pub fn flatten_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut flat = BTreeMap::new();
    for name in headers.keys() {
        let joined = headers
            .get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect::<Vec<_>>()
            .join(", ");
        flat.insert(name.as_str().to_ascii_lowercase(), joined);
    }
    flat
}
