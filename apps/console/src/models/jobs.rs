use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

/// A single job posting from the search service.
/// Identity is `(source, source_job_id)`; uniqueness is the search service's concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobListing {
    pub source: String,
    pub source_job_id: String,
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub remote: Option<bool>,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub keywords: Option<Vec<String>>,
    #[serde(default)]
    pub salary: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub posted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub extras: BTreeMap<String, Value>,
}

impl JobListing {
    pub fn identity(&self) -> (&str, &str) {
        (&self.source, &self.source_job_id)
    }
}

/// A timestamp that does not parse decodes as absent instead of failing the listing.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(Value::as_str)
        .and_then(parse_timestamp))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    // Naive timestamps are taken as UTC.
    chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Decodes a search response body. A non-array yields no listings;
/// elements that are not listings are skipped.
pub fn decode_listings(body: Value) -> Vec<JobListing> {
    let Value::Array(items) = body else {
        return Vec::new();
    };
    items
        .into_iter()
        .enumerate()
        .filter_map(|(idx, item)| match serde_json::from_value::<JobListing>(item) {
            Ok(listing) => Some(listing),
            Err(e) => {
                warn!("Skipping search result {idx}: {e}");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn listing_json() -> Value {
        json!({
            "source": "remotive",
            "source_job_id": "123",
            "title": "Rust Engineer",
            "company": "Acme",
            "location": "Bucharest, RO",
            "remote": true,
            "url": "https://jobs.example.com/123",
            "keywords": ["rust", "tokio"],
            "posted_at": "2025-03-01T10:00:00Z",
            "extras": {"category": "Software Development"}
        })
    }

    #[test]
    fn test_decodes_full_listing() {
        let listings = decode_listings(json!([listing_json()]));
        assert_eq!(listings.len(), 1);
        let job = &listings[0];
        assert_eq!(job.identity(), ("remotive", "123"));
        assert_eq!(job.remote, Some(true));
        assert_eq!(job.keywords.as_deref().unwrap(), ["rust", "tokio"]);
        assert_eq!(job.posted_at.unwrap().to_rfc3339(), "2025-03-01T10:00:00+00:00");
    }

    #[test]
    fn test_optional_fields_may_be_missing_or_null() {
        let listings = decode_listings(json!([{
            "source": "adzuna",
            "source_job_id": "9",
            "title": "Dev",
            "company": "X",
            "location": null,
            "url": "https://x.example.com/9"
        }]));
        assert_eq!(listings.len(), 1);
        assert!(listings[0].location.is_none());
        assert!(listings[0].extras.is_empty());
    }

    #[test]
    fn test_naive_and_garbage_timestamps() {
        let mut naive = listing_json();
        naive["posted_at"] = json!("2025-03-01T10:00:00");
        let mut garbage = listing_json();
        garbage["posted_at"] = json!("last tuesday");

        let listings = decode_listings(json!([naive, garbage]));
        assert_eq!(listings.len(), 2);
        assert!(listings[0].posted_at.is_some());
        assert!(listings[1].posted_at.is_none());
    }

    #[test]
    fn test_non_array_is_empty() {
        assert!(decode_listings(json!({"error": "missing q"})).is_empty());
        assert!(decode_listings(Value::Null).is_empty());
    }

    #[test]
    fn test_malformed_elements_are_skipped() {
        let listings = decode_listings(json!([{"title": "no ids"}, listing_json()]));
        assert_eq!(listings.len(), 1);
    }
}
