use serde_json::json;
use tracing::info;
use url::Url;

use super::{protocol_failure, Notice, ServiceClient};
use crate::errors::ClientError;
use crate::http::OutboundRequest;
use crate::models::jobs::{decode_listings, JobListing};
use crate::settings::{SearchQuery, Service};

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResults {
    pub listings: Vec<JobListing>,
}

impl Notice for SearchResults {
    fn notice(&self) -> String {
        match self.listings.len() {
            1 => "Found 1 job".to_string(),
            n => format!("Found {n} jobs"),
        }
    }
}

/// Resolves the configured search endpoint. Query parameters are appended only
/// when the endpoint carries no query string of its own.
pub fn search_url(endpoint: &str, origin: &Url, query: &SearchQuery) -> Result<Url, url::ParseError> {
    let mut url = origin.join(endpoint)?;
    if url.query().map_or(true, str::is_empty) {
        let query = query.clone().normalized();
        url.query_pairs_mut()
            .clear()
            .append_pair("q", &query.keywords)
            .append_pair("location", &query.location)
            .append_pair("page", &query.page.to_string())
            .append_pair("results_per_page", &query.results_per_page.to_string());
    }
    Ok(url)
}

impl ServiceClient {
    /// GET {search-endpoint}?q=…&location=…&page=…&results_per_page=…
    ///
    /// The query is remembered for the next session. A malformed success body
    /// is an empty result, not a failure.
    pub async fn search_jobs(&self, query: &SearchQuery) -> Result<SearchResults, ClientError> {
        let _busy = self.busy.enter();
        self.settings.set_search_query(query);

        let endpoint = self.settings.endpoints().search;
        let url = search_url(&endpoint, self.settings.origin(), query).map_err(|e| {
            ClientError::InvalidEndpoint {
                service: Service::Search,
                base: endpoint.clone(),
                reason: e.to_string(),
            }
        })?;

        let response = self
            .http
            .send(OutboundRequest::get(url).accept_json())
            .await?;

        let body = response.json_or(json!([]));
        if !response.is_success() {
            return Err(protocol_failure(
                response.status,
                &body,
                "error",
                format!("Search failed: {}", response.status.as_u16()),
            ));
        }

        let listings = decode_listings(body);
        info!("Search for '{}' returned {} listings", query.keywords, listings.len());
        Ok(SearchResults { listings })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fixtures;

    fn origin() -> Url {
        Url::parse("http://localhost:5173").unwrap()
    }

    fn query(keywords: &str, location: &str) -> SearchQuery {
        SearchQuery {
            keywords: keywords.to_string(),
            location: location.to_string(),
            page: 1,
            results_per_page: 20,
        }
    }

    #[test]
    fn test_appends_all_four_params() {
        let url = search_url(
            "https://api.example.com/jobs/search",
            &origin(),
            &query("engineer", "Bucharest, RO"),
        )
        .unwrap();
        assert_eq!(
            url.query(),
            Some("q=engineer&location=Bucharest%2C+RO&page=1&results_per_page=20")
        );
    }

    #[test]
    fn test_preconfigured_query_is_used_verbatim() {
        let endpoint = "https://api.example.com/jobs/search?q=rust&page=2";
        let url = search_url(endpoint, &origin(), &query("engineer", "Cluj")).unwrap();
        assert_eq!(url.as_str(), endpoint);
    }

    #[test]
    fn test_relative_endpoint_resolves_against_origin() {
        let url = search_url("/jobs/search", &origin(), &query("dev", "")).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:5173/jobs/search?q=dev&location=&page=1&results_per_page=20"
        );
    }

    #[test]
    fn test_bare_question_mark_counts_as_no_query() {
        let url = search_url("https://api.example.com/search?", &origin(), &query("a", "b")).unwrap();
        assert_eq!(url.query(), Some("q=a&location=b&page=1&results_per_page=20"));
    }

    #[tokio::test]
    async fn test_search_decodes_listings() {
        let (client, transport) = fixtures::client();
        transport.reply_json(
            200,
            json!([{
                "source": "remotive",
                "source_job_id": "1",
                "title": "Rust Engineer",
                "company": "Acme",
                "url": "https://jobs.example.com/1"
            }]),
        );

        let results = client
            .search_jobs(&query("engineer", "Bucharest, RO"))
            .await
            .unwrap();

        assert_eq!(results.listings.len(), 1);
        assert_eq!(results.notice(), "Found 1 job");
        assert_eq!(
            transport.requests()[0].url.as_str(),
            "https://api.example.com/jobs/search?q=engineer&location=Bucharest%2C+RO&page=1&results_per_page=20"
        );
        assert_eq!(client.settings().search_query().keywords, "engineer");
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_empty() {
        let (client, transport) = fixtures::client();
        transport.reply_text(200, "not json");

        let results = client.search_jobs(&query("x", "y")).await.unwrap();
        assert!(results.listings.is_empty());
    }

    #[tokio::test]
    async fn test_search_error_prefers_error_field() {
        let (client, transport) = fixtures::client();
        transport.reply_json(400, json!({"error": "missing q"}));

        let err = client.search_jobs(&query("", "")).await.unwrap_err();
        assert_eq!(err.to_string(), "missing q");
        assert_eq!(err.status(), Some(400));
    }

    #[tokio::test]
    async fn test_search_error_without_body() {
        let (client, transport) = fixtures::client();
        transport.reply_text(503, "");

        let err = client.search_jobs(&query("x", "y")).await.unwrap_err();
        assert_eq!(err.to_string(), "Search failed: 503");
    }
}
