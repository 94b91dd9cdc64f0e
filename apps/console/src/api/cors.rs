use reqwest::Method;

use super::{Notice, ServiceClient};
use crate::errors::ClientError;
use crate::http::OutboundRequest;
use crate::settings::Service;

/// Shown in place of an `access-control-allow-*` header the server did not send.
pub const EMPTY_SET: &str = "∅";

const REQUESTED_METHOD: &str = "POST";
const REQUESTED_HEADERS: &str = "content-type,authorization";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsReport {
    pub ok: bool,
    pub status: u16,
    pub allow_origin: String,
    pub allow_methods: String,
    pub allow_headers: String,
}

impl Notice for CorsReport {
    fn notice(&self) -> String {
        let verdict = if self.ok {
            "OK".to_string()
        } else {
            self.status.to_string()
        };
        format!(
            "CORS preflight {verdict}: Allow-Origin={} | Methods={} | Headers={}",
            self.allow_origin, self.allow_methods, self.allow_headers
        )
    }
}

impl ServiceClient {
    /// OPTIONS {identity}/auth/login as a browser preflight would send it.
    ///
    /// Informational: a non-2xx answer is still a report. The exchange is
    /// always recorded in diagnostics, success included.
    pub async fn probe_cors(&self) -> Result<CorsReport, ClientError> {
        let _busy = self.busy.enter();
        let url = self.endpoint(Service::Identity, "/auth/login")?;
        let origin = self.settings.origin().origin().ascii_serialization();

        let response = self
            .http
            .send_recorded(
                OutboundRequest::new(Method::OPTIONS, url)
                    .header("origin", origin)
                    .header("access-control-request-method", REQUESTED_METHOD)
                    .header("access-control-request-headers", REQUESTED_HEADERS),
            )
            .await?;

        let allow = |name: &str| {
            response
                .header(name)
                .filter(|v| !v.is_empty())
                .unwrap_or(EMPTY_SET)
                .to_string()
        };
        Ok(CorsReport {
            ok: response.is_success(),
            status: response.status.as_u16(),
            allow_origin: allow("access-control-allow-origin"),
            allow_methods: allow("access-control-allow-methods"),
            allow_headers: allow("access-control-allow-headers"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fixtures;
    use crate::errors::ErrorKind;

    #[tokio::test]
    async fn test_successful_preflight_is_reported_and_recorded() {
        let (client, transport) = fixtures::client();
        transport.reply_with_headers(
            204,
            &[
                ("access-control-allow-origin", "http://localhost:5173"),
                ("access-control-allow-methods", "GET, POST, OPTIONS"),
            ],
            "",
        );

        let report = client.probe_cors().await.unwrap();

        assert!(report.ok);
        assert_eq!(report.allow_origin, "http://localhost:5173");
        assert_eq!(report.allow_headers, EMPTY_SET);
        assert_eq!(
            report.notice(),
            "CORS preflight OK: Allow-Origin=http://localhost:5173 | Methods=GET, POST, OPTIONS | Headers=∅"
        );

        let request = &transport.requests()[0];
        assert_eq!(request.method, Method::OPTIONS);
        assert_eq!(request.url.as_str(), "https://api.example.com/auth/login");
        assert_eq!(request.headers["origin"], "http://localhost:5173");
        assert_eq!(request.headers["access-control-request-method"], "POST");
        assert_eq!(
            request.headers["access-control-request-headers"],
            "content-type,authorization"
        );

        let record = client.diagnostics().last().unwrap();
        assert_eq!(record.request.method, "OPTIONS");
        assert!(record.response.unwrap().ok);
    }

    #[tokio::test]
    async fn test_rejected_preflight_is_still_a_report() {
        let (client, transport) = fixtures::client();
        transport.reply_text(403, "");

        let report = client.probe_cors().await.unwrap();

        assert!(!report.ok);
        assert!(report.notice().starts_with("CORS preflight 403:"));
        assert_eq!(report.allow_methods, EMPTY_SET);
    }

    #[tokio::test]
    async fn test_transport_failure_surfaces_message() {
        let (client, transport) = fixtures::client();
        transport.reply_error("error sending request: connection refused");

        let err = client.probe_cors().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(client.diagnostics().last().unwrap().error.is_some());
    }
}
