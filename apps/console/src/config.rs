use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use url::Url;

/// Base URL of the deployed API gateway; used for every service until edited.
pub const DEFAULT_API_BASE: &str = "https://nqa4hzzjff.execute-api.eu-central-1.amazonaws.com";
pub const DEFAULT_ORIGIN: &str = "http://localhost:5173";

/// Process configuration loaded from environment variables.
/// User-editable settings (base URLs, session, last search) live in the store instead.
#[derive(Debug, Clone)]
pub struct Config {
    pub store_path: PathBuf,
    pub origin: Url,
    pub default_api_base: String,
    pub http_timeout: Option<Duration>,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let origin = std::env::var("JOBSCV_ORIGIN").unwrap_or_else(|_| DEFAULT_ORIGIN.to_string());
        let origin = Url::parse(&origin)
            .with_context(|| format!("JOBSCV_ORIGIN '{origin}' is not an absolute URL"))?;

        let http_timeout = match std::env::var("JOBSCV_HTTP_TIMEOUT_SECS") {
            Ok(raw) => Some(Duration::from_secs(
                raw.parse::<u64>()
                    .context("JOBSCV_HTTP_TIMEOUT_SECS must be a whole number of seconds")?,
            )),
            Err(_) => None,
        };

        Ok(Config {
            store_path: std::env::var("JOBSCV_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_store_path()),
            origin,
            default_api_base: std::env::var("JOBSCV_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            http_timeout,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn default_store_path() -> PathBuf {
    match dirs::config_dir() {
        Some(dir) => dir.join("jobscv").join("console.json"),
        None => PathBuf::from("jobscv-console.json"),
    }
}
