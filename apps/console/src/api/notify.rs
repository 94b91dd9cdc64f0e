use serde_json::json;
use tracing::info;

use super::{protocol_failure, Notice, ServiceClient};
use crate::errors::ClientError;
use crate::http::OutboundRequest;
use crate::settings::Service;

pub const NOTIFY_CHANNEL: &str = "console";
pub const DEFAULT_SUBJECT: &str = "JobsCVAgg test message";
pub const DEFAULT_MESSAGE: &str = "Hello from the demo UI!";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Blank means the session email.
    pub to: String,
    pub subject: String,
    pub message: String,
}

impl Default for Notification {
    fn default() -> Self {
        Self {
            to: String::new(),
            subject: DEFAULT_SUBJECT.to_string(),
            message: DEFAULT_MESSAGE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationSent {
    pub to: String,
}

impl Notice for NotificationSent {
    fn notice(&self) -> String {
        format!("Notification sent to {}", self.to)
    }
}

impl ServiceClient {
    /// POST {notify}/notifications/send
    pub async fn send_notification(
        &self,
        notification: &Notification,
    ) -> Result<NotificationSent, ClientError> {
        let _busy = self.busy.enter();
        let to = match notification.to.trim() {
            "" => self.settings.session().email,
            to => to.to_string(),
        };
        let url = self.endpoint(Service::Notify, "/notifications/send")?;

        let response = self
            .http
            .send(OutboundRequest::post(url).accept_json().json(json!({
                "to": to,
                "subject": notification.subject,
                "message": notification.message,
                "channel": NOTIFY_CHANNEL,
            })))
            .await?;

        let body = response.json_or(json!({}));
        if !response.is_success() {
            return Err(protocol_failure(
                response.status,
                &body,
                "detail",
                format!("Failed: {}", response.status.as_u16()),
            ));
        }
        info!("Notification sent to {to}");
        Ok(NotificationSent { to })
    }
}
