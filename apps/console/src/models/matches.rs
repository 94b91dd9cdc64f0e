use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire shapes the matching service has been seen to answer with.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MatchesPayload {
    Bare(Vec<Value>),
    Wrapped { items: Vec<Value> },
    Other(Value),
}

impl MatchesPayload {
    pub fn decode(body: Value) -> Self {
        serde_json::from_value(body.clone()).unwrap_or(MatchesPayload::Other(body))
    }

    /// Collapses every shape into one list. Unknown shapes are empty.
    pub fn into_matches(self) -> Vec<JobMatch> {
        let items = match self {
            MatchesPayload::Bare(items) | MatchesPayload::Wrapped { items } => items,
            MatchesPayload::Other(_) => Vec::new(),
        };
        items.iter().map(JobMatch::from_value).collect()
    }
}

/// A job scored against the operator's CV keywords.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobMatch {
    pub source: Option<String>,
    pub source_job_id: Option<String>,
    pub title: String,
    pub company: Option<String>,
    pub url: Option<String>,
    pub score: Option<f64>,
    pub keywords: Vec<String>,
}

impl JobMatch {
    fn from_value(item: &Value) -> Self {
        let text = |fields: &[&str]| {
            fields
                .iter()
                .find_map(|f| item.get(*f).and_then(Value::as_str))
                .filter(|s| !s.is_empty())
                .map(String::from)
        };
        Self {
            source: text(&["source"]),
            source_job_id: text(&["source_job_id"]),
            title: text(&["title", "job_title"]).unwrap_or_else(|| "Match".to_string()),
            company: text(&["company", "company_name"]),
            url: text(&["url"]),
            score: item.get("score").and_then(Value::as_f64),
            keywords: item
                .get("keywords")
                .and_then(Value::as_array)
                .map(|kws| kws.iter().filter_map(Value::as_str).map(String::from).collect())
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bare_array() {
        let matches = MatchesPayload::decode(json!([
            {"title": "Rust Engineer", "company": "Acme", "score": 0.82, "keywords": ["rust"]}
        ]))
        .into_matches();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].title, "Rust Engineer");
        assert_eq!(matches[0].score, Some(0.82));
        assert_eq!(matches[0].keywords, ["rust"]);
    }

    #[test]
    fn test_wrapped_items_with_alternate_field_names() {
        let matches = MatchesPayload::decode(json!({
            "items": [{"job_title": "Data Engineer", "company_name": "Beta"}]
        }))
        .into_matches();
        assert_eq!(matches[0].title, "Data Engineer");
        assert_eq!(matches[0].company.as_deref(), Some("Beta"));
        assert_eq!(matches[0].score, None);
    }

    #[test]
    fn test_other_shapes_are_empty() {
        assert!(MatchesPayload::decode(json!({"detail": "nope"}))
            .into_matches()
            .is_empty());
        assert!(MatchesPayload::decode(json!("text")).into_matches().is_empty());
        assert!(MatchesPayload::decode(json!({"items": "bad"}))
            .into_matches()
            .is_empty());
    }

    #[test]
    fn test_untitled_match_gets_placeholder() {
        let matches = MatchesPayload::decode(json!([{}])).into_matches();
        assert_eq!(matches[0].title, "Match");
    }
}
