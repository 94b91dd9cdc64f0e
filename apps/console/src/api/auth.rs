use serde_json::{json, Value};
use tracing::info;

use super::{is_truthy, protocol_failure, Notice, ServiceClient};
use crate::errors::ClientError;
use crate::http::OutboundRequest;
use crate::session::PLACEHOLDER_TOKEN;
use crate::settings::Service;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registered;

impl Notice for Registered {
    fn notice(&self) -> String {
        "Registration successful. Check your inbox to verify your email.".to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedIn {
    /// The server confirmed the login without issuing a token.
    pub placeholder_token: bool,
}

impl Notice for LoggedIn {
    fn notice(&self) -> String {
        "Logged in".to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedOut;

impl Notice for LoggedOut {
    fn notice(&self) -> String {
        "Logged out".to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyLink {
    /// To be opened by the caller outside this client.
    Url(String),
    AlreadyVerified,
}

impl Notice for VerifyLink {
    fn notice(&self) -> String {
        match self {
            VerifyLink::Url(url) => format!("Open to verify your email: {url}"),
            VerifyLink::AlreadyVerified => "Already verified".to_string(),
        }
    }
}

impl ServiceClient {
    /// POST {identity}/auth/register
    pub async fn register(&self, email: &str, password: &str) -> Result<Registered, ClientError> {
        let _busy = self.busy.enter();
        self.settings.set_email(email);
        let url = self.endpoint(Service::Identity, "/auth/register")?;

        let response = self
            .http
            .send(
                OutboundRequest::post(url)
                    .accept_json()
                    .json(json!({ "email": email, "password": password })),
            )
            .await?;

        if !response.is_success() {
            return Err(ClientError::protocol(
                response.status.as_u16(),
                format!("Register failed: {}", response.status.as_u16()),
            ));
        }
        info!("Registered {email}");
        Ok(Registered)
    }

    /// POST {identity}/auth/login
    ///
    /// Stores `access_token` as the session token. A bare `{"ok": true}` stores
    /// a placeholder token. A success carrying neither is reported as
    /// [`ClientError::TokenMissing`] and leaves the session untouched.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoggedIn, ClientError> {
        let _busy = self.busy.enter();
        self.settings.set_email(email);
        let url = self.endpoint(Service::Identity, "/auth/login")?;

        let response = self
            .http
            .send(
                OutboundRequest::post(url)
                    .accept_json()
                    .json(json!({ "email": email, "password": password })),
            )
            .await?;

        let body = response.json_or(json!({}));
        if !response.is_success() {
            return Err(protocol_failure(
                response.status,
                &body,
                "detail",
                format!("Login failed: {}", response.status.as_u16()),
            ));
        }

        let token = body
            .get("access_token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty());
        let outcome = match token {
            Some(token) => {
                self.settings.set_token(Some(token));
                LoggedIn {
                    placeholder_token: false,
                }
            }
            None if is_truthy(body.get("ok")) => {
                self.settings.set_token(Some(PLACEHOLDER_TOKEN));
                LoggedIn {
                    placeholder_token: true,
                }
            }
            None => return Err(ClientError::TokenMissing),
        };
        info!("Logged in as {email}");
        Ok(outcome)
    }

    /// Drops the session token; the email is kept for the next login.
    pub fn logout(&self) -> LoggedOut {
        self.settings.logout();
        info!("Logged out");
        LoggedOut
    }

    /// GET {identity}/auth/_debug/verify_link?email=…
    pub async fn fetch_verify_link(&self, email: &str) -> Result<VerifyLink, ClientError> {
        let _busy = self.busy.enter();
        self.settings.set_email(email);
        let mut url = self.endpoint(Service::Identity, "/auth/_debug/verify_link")?;
        url.query_pairs_mut().append_pair("email", email);

        let response = self
            .http
            .send(OutboundRequest::get(url).accept_json())
            .await?;

        let body = response.json_or(json!({}));
        if !response.is_success() {
            return Err(protocol_failure(
                response.status,
                &body,
                "detail",
                format!("Error: {}", response.status.as_u16()),
            ));
        }

        Ok(match body.get("url").and_then(Value::as_str) {
            Some(link) if !link.is_empty() => VerifyLink::Url(link.to_string()),
            _ => VerifyLink::AlreadyVerified,
        })
    }
}
