//! Persisted, operator-editable settings: per-service base URLs,
//! the session, and the last search query.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use url::Url;

use crate::errors::ClientError;
use crate::session::Session;
use crate::store::ConfigStore;

const KEY_EMAIL: &str = "auth.email";
const KEY_TOKEN: &str = "auth.token";
const KEY_QUERY: &str = "search.q";
const KEY_LOCATION: &str = "search.loc";
const KEY_PAGE: &str = "search.page";
const KEY_PER_PAGE: &str = "search.perPage";

pub const DEFAULT_KEYWORDS: &str = "software engineer";
pub const DEFAULT_LOCATION: &str = "Bucharest, RO";
pub const DEFAULT_RESULTS_PER_PAGE: u32 = 20;

/// The five backend services this client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Service {
    Identity,
    Search,
    Notify,
    Documents,
    Matching,
}

impl Service {
    pub const ALL: [Service; 5] = [
        Service::Identity,
        Service::Search,
        Service::Notify,
        Service::Documents,
        Service::Matching,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Service::Identity => "identity",
            Service::Search => "search",
            Service::Notify => "notify",
            Service::Documents => "documents",
            Service::Matching => "matching",
        }
    }

    pub fn from_name(name: &str) -> Option<Service> {
        Service::ALL.into_iter().find(|s| s.name() == name)
    }

    fn store_key(self) -> &'static str {
        match self {
            Service::Identity => "cfg.umBase",
            Service::Search => "cfg.aggBase",
            Service::Notify => "cfg.notifBase",
            Service::Documents => "cfg.cvBase",
            Service::Matching => "cfg.matcherBase",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Base URL per service. The search entry is a full endpoint, possibly with a query string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceEndpointSet {
    pub identity: String,
    pub search: String,
    pub notify: String,
    pub documents: String,
    pub matching: String,
}

impl ServiceEndpointSet {
    /// Built-in defaults: every service behind one gateway, search at `/jobs/search`.
    pub fn defaults(api_base: &str) -> Self {
        let api_base = api_base.trim_end_matches('/');
        Self {
            identity: api_base.to_string(),
            search: format!("{api_base}/jobs/search"),
            notify: api_base.to_string(),
            documents: api_base.to_string(),
            matching: api_base.to_string(),
        }
    }

    pub fn get(&self, service: Service) -> &str {
        match service {
            Service::Identity => &self.identity,
            Service::Search => &self.search,
            Service::Notify => &self.notify,
            Service::Documents => &self.documents,
            Service::Matching => &self.matching,
        }
    }

    fn slot(&mut self, service: Service) -> &mut String {
        match service {
            Service::Identity => &mut self.identity,
            Service::Search => &mut self.search,
            Service::Notify => &mut self.notify,
            Service::Documents => &mut self.documents,
            Service::Matching => &mut self.matching,
        }
    }
}

/// Resolves a base URL (absolute or root-relative) against `origin`
/// and strips the trailing slash.
pub fn resolve_base(base: &str, origin: &Url) -> Result<String, url::ParseError> {
    let url = match Url::parse(base) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => origin.join(base)?,
        Err(e) => return Err(e),
    };
    Ok(url.as_str().trim_end_matches('/').to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub keywords: String,
    pub location: String,
    pub page: u32,
    pub results_per_page: u32,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            keywords: DEFAULT_KEYWORDS.to_string(),
            location: DEFAULT_LOCATION.to_string(),
            page: 1,
            results_per_page: DEFAULT_RESULTS_PER_PAGE,
        }
    }
}

impl SearchQuery {
    /// Clamps page to at least 1 and replaces a zero page size with the default.
    pub fn normalized(mut self) -> Self {
        self.page = self.page.max(1);
        if self.results_per_page == 0 {
            self.results_per_page = DEFAULT_RESULTS_PER_PAGE;
        }
        self
    }
}

/// Store-backed view over endpoints, session and search query.
/// Every setter writes through to the store immediately.
#[derive(Clone)]
pub struct Settings {
    store: Arc<ConfigStore>,
    origin: Url,
    defaults: ServiceEndpointSet,
}

impl Settings {
    pub fn new(store: Arc<ConfigStore>, origin: Url, default_api_base: &str) -> Self {
        Self {
            store,
            origin,
            defaults: ServiceEndpointSet::defaults(default_api_base),
        }
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn endpoints(&self) -> ServiceEndpointSet {
        let mut set = self.defaults.clone();
        for service in Service::ALL {
            let default = self.defaults.get(service).to_string();
            *set.slot(service) = self.store.get(service.store_key(), default);
        }
        set
    }

    /// Stores a new base for `service`. A value that does not resolve
    /// against the origin is rejected and the stored base is kept.
    pub fn set_endpoint(&self, service: Service, value: &str) -> Result<(), ClientError> {
        let value = value.trim();
        resolve_base(value, &self.origin).map_err(|e| ClientError::InvalidEndpoint {
            service,
            base: value.to_string(),
            reason: e.to_string(),
        })?;
        self.store.set(service.store_key(), &value);
        Ok(())
    }

    pub fn reset_endpoints(&self) {
        self.store.set_many(
            Service::ALL
                .into_iter()
                .map(|service| (service.store_key(), Value::from(self.defaults.get(service)))),
        );
        info!("API bases reset to defaults");
    }

    /// Resolved base for `service`, with no trailing slash.
    pub fn base_url(&self, service: Service) -> Result<String, ClientError> {
        let endpoints = self.endpoints();
        let base = endpoints.get(service);
        resolve_base(base, &self.origin).map_err(|e| ClientError::InvalidEndpoint {
            service,
            base: base.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn session(&self) -> Session {
        Session {
            email: self.store.get(KEY_EMAIL, String::new()),
            token: self.store.get(KEY_TOKEN, None),
        }
    }

    pub fn set_email(&self, email: &str) {
        self.store.set(KEY_EMAIL, &email.trim());
    }

    pub fn set_token(&self, token: Option<&str>) {
        self.store.set(KEY_TOKEN, &token);
    }

    /// Clears the token and keeps the email.
    pub fn logout(&self) {
        self.set_token(None);
    }

    pub fn search_query(&self) -> SearchQuery {
        let defaults = SearchQuery::default();
        SearchQuery {
            keywords: self.store.get(KEY_QUERY, defaults.keywords),
            location: self.store.get(KEY_LOCATION, defaults.location),
            page: self.store.get(KEY_PAGE, defaults.page),
            results_per_page: self.store.get(KEY_PER_PAGE, defaults.results_per_page),
        }
        .normalized()
    }

    pub fn set_search_query(&self, query: &SearchQuery) {
        let query = query.clone().normalized();
        self.store.set_many([
            (KEY_QUERY, Value::from(query.keywords)),
            (KEY_LOCATION, Value::from(query.location)),
            (KEY_PAGE, Value::from(query.page)),
            (KEY_PER_PAGE, Value::from(query.results_per_page)),
        ]);
    }
}
