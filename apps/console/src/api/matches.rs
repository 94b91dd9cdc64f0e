use serde_json::json;
use tracing::info;

use super::{protocol_failure, Notice, ServiceClient};
use crate::errors::ClientError;
use crate::http::OutboundRequest;
use crate::models::matches::{JobMatch, MatchesPayload};
use crate::settings::Service;

#[derive(Debug, Clone, PartialEq)]
pub struct MatchList {
    pub matches: Vec<JobMatch>,
}

impl Notice for MatchList {
    fn notice(&self) -> String {
        match self.matches.len() {
            0 => "No matches yet".to_string(),
            n => format!("Loaded {n} matches"),
        }
    }
}

impl ServiceClient {
    /// GET {matching}/me/matches
    pub async fn fetch_matches(&self) -> Result<MatchList, ClientError> {
        let authorization = self.authorization()?;
        let _busy = self.busy.enter();
        let url = self.endpoint(Service::Matching, "/me/matches")?;

        let response = self
            .http
            .send(
                OutboundRequest::get(url)
                    .accept_json()
                    .bearer(Some(authorization)),
            )
            .await?;

        let body = response.json_or(json!({}));
        if !response.is_success() {
            return Err(protocol_failure(
                response.status,
                &body,
                "detail",
                "Fetch matches failed".to_string(),
            ));
        }

        let matches = MatchesPayload::decode(body).into_matches();
        info!("Fetched {} matches", matches.len());
        Ok(MatchList { matches })
    }
}
