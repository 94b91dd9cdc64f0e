use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::api::ServiceClient;
use crate::config::Config;
use crate::diagnostics::Diagnostics;
use crate::http::{HttpClient, ReqwestTransport};
use crate::settings::Settings;
use crate::store::ConfigStore;

/// Everything a front end needs, wired once at startup.
#[derive(Clone)]
pub struct ConsoleState {
    pub config: Config,
    pub settings: Settings,
    pub diagnostics: Arc<Diagnostics>,
    pub client: ServiceClient,
}

impl ConsoleState {
    pub fn build(config: Config) -> Result<Self> {
        let store = Arc::new(ConfigStore::open(&config.store_path));
        let settings = Settings::new(store, config.origin.clone(), &config.default_api_base);

        let transport = ReqwestTransport::new(config.http_timeout)
            .context("failed to build HTTP transport")?;
        let diagnostics = Arc::new(Diagnostics::new());
        let http = HttpClient::new(Arc::new(transport), diagnostics.clone());
        let client = ServiceClient::new(http, settings.clone());

        info!(
            "Console state ready (store: {}, origin: {})",
            config.store_path.display(),
            config.origin
        );
        Ok(Self {
            config,
            settings,
            diagnostics,
            client,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Service;
    use std::time::Duration;
    use url::Url;

    fn config(dir: &tempfile::TempDir) -> Config {
        Config {
            store_path: dir.path().join("console.json"),
            origin: Url::parse("http://localhost:5173").unwrap(),
            default_api_base: "https://api.example.com".to_string(),
            http_timeout: Some(Duration::from_secs(5)),
            rust_log: "info".to_string(),
        }
    }

    #[test]
    fn test_build_shares_settings_and_diagnostics() {
        let dir = tempfile::tempdir().unwrap();
        let state = ConsoleState::build(config(&dir)).unwrap();

        state.settings.set_email("a@b.com");
        assert_eq!(state.client.settings().session().email, "a@b.com");
        assert!(Arc::ptr_eq(&state.diagnostics, state.client.diagnostics()));
        assert_eq!(
            state.settings.base_url(Service::Matching).unwrap(),
            "https://api.example.com"
        );
    }

    #[test]
    fn test_settings_survive_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        let first = ConsoleState::build(config(&dir)).unwrap();
        first
            .settings
            .set_endpoint(Service::Notify, "https://notify.example.com")
            .unwrap();
        first.settings.set_token(Some("t0k"));
        drop(first);

        let second = ConsoleState::build(config(&dir)).unwrap();
        assert_eq!(
            second.settings.endpoints().notify,
            "https://notify.example.com"
        );
        assert!(second.client.is_authenticated());
    }
}
