//! Service client operations, one per backend capability.
//!
//! Every operation builds its request(s), sends them through the shared
//! [`HttpClient`], and normalizes the outcome into a typed value or a
//! [`ClientError`] whose text is the operator-facing status message.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::diagnostics::Diagnostics;
use crate::errors::ClientError;
use crate::http::HttpClient;
use crate::settings::{Service, Settings};

pub mod auth;
pub mod cors;
pub mod cv;
pub mod jobs;
pub mod matches;
pub mod notify;

/// Confirmation text shown when an operation succeeds.
pub trait Notice {
    fn notice(&self) -> String;
}

/// What the presentation layer shows after an operation settles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusLine {
    pub ok: bool,
    pub message: String,
}

/// Folds an operation result into a single status line. Nothing escapes as an error.
pub fn settle<T: Notice>(result: &Result<T, ClientError>) -> StatusLine {
    match result {
        Ok(value) => StatusLine {
            ok: true,
            message: value.notice(),
        },
        Err(e) => StatusLine {
            ok: false,
            message: e.to_string(),
        },
    }
}

/// Advisory in-flight indicator shared by all operations.
/// It never blocks or queues anything.
#[derive(Debug, Clone, Default)]
pub struct BusyFlag(Arc<AtomicUsize>);

impl BusyFlag {
    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::SeqCst) > 0
    }

    pub(crate) fn enter(&self) -> BusyGuard {
        self.0.fetch_add(1, Ordering::SeqCst);
        BusyGuard(self.0.clone())
    }
}

pub(crate) struct BusyGuard(Arc<AtomicUsize>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Clone)]
pub struct ServiceClient {
    http: HttpClient,
    settings: Settings,
    busy: BusyFlag,
}

impl ServiceClient {
    pub fn new(http: HttpClient, settings: Settings) -> Self {
        Self {
            http,
            settings,
            busy: BusyFlag::default(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn diagnostics(&self) -> &Arc<Diagnostics> {
        self.http.diagnostics()
    }

    pub fn busy(&self) -> &BusyFlag {
        &self.busy
    }

    pub fn is_authenticated(&self) -> bool {
        self.settings.session().is_authenticated()
    }

    /// `path` appended to the resolved base of `service`.
    fn endpoint(&self, service: Service, path: &str) -> Result<Url, ClientError> {
        let base = self.settings.base_url(service)?;
        Url::parse(&format!("{base}{path}")).map_err(|e| ClientError::InvalidEndpoint {
            service,
            base,
            reason: e.to_string(),
        })
    }

    /// The `Authorization` value, or a local refusal when logged out.
    fn authorization(&self) -> Result<String, ClientError> {
        self.settings
            .session()
            .bearer()
            .ok_or(ClientError::NotAuthenticated)
    }
}

/// Server-supplied message under `field`, if there is a usable one.
fn server_message(body: &Value, field: &str) -> Option<String> {
    match body.get(field)? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// A protocol failure, preferring the server's own message over `fallback`.
fn protocol_failure(status: StatusCode, body: &Value, field: &str, fallback: String) -> ClientError {
    ClientError::protocol(
        status.as_u16(),
        server_message(body, field).unwrap_or(fallback),
    )
}

/// JavaScript-style truthiness, as the identity service's `ok` flag is loosely typed.
fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::http::testing::ScriptedTransport;
    use crate::store::ConfigStore;

    pub const API_BASE: &str = "https://api.example.com";

    pub fn client() -> (ServiceClient, Arc<ScriptedTransport>) {
        let transport = Arc::new(ScriptedTransport::new());
        let http = HttpClient::new(transport.clone(), Arc::new(Diagnostics::new()));
        let settings = Settings::new(
            Arc::new(ConfigStore::in_memory()),
            Url::parse("http://localhost:5173").unwrap(),
            API_BASE,
        );
        (ServiceClient::new(http, settings), transport)
    }

    pub fn logged_in_client() -> (ServiceClient, Arc<ScriptedTransport>) {
        let (client, transport) = client();
        client.settings().set_email("a@b.com");
        client.settings().set_token(Some("abc"));
        (client, transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Done;

    impl Notice for Done {
        fn notice(&self) -> String {
            "done".to_string()
        }
    }

    #[test]
    fn test_settle_maps_both_arms() {
        assert_eq!(
            settle(&Ok::<_, ClientError>(Done)),
            StatusLine {
                ok: true,
                message: "done".to_string()
            }
        );
        let failed = settle::<Done>(&Err(ClientError::NotAuthenticated));
        assert!(!failed.ok);
        assert_eq!(failed.message, "Please log in first");
    }

    #[test]
    fn test_busy_flag_tracks_overlapping_operations() {
        let busy = BusyFlag::default();
        assert!(!busy.is_busy());
        let first = busy.enter();
        let second = busy.enter();
        drop(first);
        assert!(busy.is_busy());
        drop(second);
        assert!(!busy.is_busy());
    }

    struct HangingTransport;

    #[async_trait::async_trait]
    impl crate::http::Transport for HangingTransport {
        async fn send(
            &self,
            _request: &crate::http::OutboundRequest,
        ) -> Result<crate::http::InboundResponse, crate::errors::TransportError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_hung_request_keeps_busy_until_dropped() {
        use crate::store::ConfigStore;

        let http = HttpClient::new(Arc::new(HangingTransport), Arc::new(Diagnostics::new()));
        let settings = Settings::new(
            Arc::new(ConfigStore::in_memory()),
            Url::parse("http://localhost:5173").unwrap(),
            fixtures::API_BASE,
        );
        let client = ServiceClient::new(http, settings);

        let task = tokio::spawn({
            let client = client.clone();
            async move { client.probe_cors().await }
        });
        for _ in 0..100 {
            if client.busy().is_busy() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(client.busy().is_busy());

        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());
        assert!(!client.busy().is_busy());
    }

    #[test]
    fn test_server_message_prefers_field() {
        assert_eq!(
            server_message(&json!({"detail": "Invalid credentials"}), "detail").as_deref(),
            Some("Invalid credentials")
        );
        assert_eq!(server_message(&json!({"detail": ""}), "detail"), None);
        assert_eq!(server_message(&json!([]), "detail"), None);
        // Validation errors arrive as structured detail.
        assert!(server_message(&json!({"detail": [{"loc": ["body", "email"]}]}), "detail")
            .unwrap()
            .contains("email"));
    }

    #[test]
    fn test_protocol_failure_falls_back() {
        let err = protocol_failure(StatusCode::BAD_GATEWAY, &json!({}), "detail", "Login failed: 502".to_string());
        assert_eq!(err.status(), Some(502));
        assert_eq!(err.to_string(), "Login failed: 502");
    }

    #[test]
    fn test_truthiness() {
        assert!(is_truthy(Some(&json!(true))));
        assert!(is_truthy(Some(&json!(1))));
        assert!(is_truthy(Some(&json!("yes"))));
        assert!(!is_truthy(Some(&json!(false))));
        assert!(!is_truthy(Some(&json!(0))));
        assert!(!is_truthy(Some(&json!(""))));
        assert!(!is_truthy(None));
    }

    #[test]
    fn test_endpoint_joins_path_to_trimmed_base() {
        let (client, _) = fixtures::client();
        client
            .settings()
            .set_endpoint(Service::Identity, "/identity/")
            .unwrap();
        assert_eq!(
            client
                .endpoint(Service::Identity, "/auth/login")
                .unwrap()
                .as_str(),
            "http://localhost:5173/identity/auth/login"
        );
    }
}
