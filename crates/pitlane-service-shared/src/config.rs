//! Service configuration read from the environment.
//!
//! # Environment Variables
//!
//! - `PITLANE_STORE_URL`: base URL of the PostgREST service
//! - `PITLANE_STORE_KEY`: API key for the PostgREST service (optional)
//! - `PITLANE_STORE_TIMEOUT_SECS`: HTTP timeout in seconds (default: 10)
//! - `PITLANE_DATASET_PATH`: JSON dataset served from memory when no store URL is set
//! - `PITLANE_BASE_PATH`: mount prefix of the API routes (default: `/api`)
//! - `SERVICE_PORT`: HTTP port (default: 8080)

use std::path::PathBuf;
use std::time::Duration;

use pitlane_lib::rest::DEFAULT_TIMEOUT;
use pitlane_lib::RestClientConfig;

/// Default mount prefix for the API routes.
pub const DEFAULT_BASE_PATH: &str = "/api";

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8080;

/// Where rows come from.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    /// Remote PostgREST service.
    Rest {
        url: String,
        api_key: Option<String>,
        timeout: Duration,
    },
    /// JSON dataset file loaded into memory.
    Dataset(PathBuf),
}

impl DataSource {
    /// Client settings for the remote service, if this is one.
    pub fn rest_config(&self) -> Option<RestClientConfig> {
        match self {
            DataSource::Rest {
                url,
                api_key,
                timeout,
            } => {
                let config = RestClientConfig::new(url.clone()).with_timeout(*timeout);
                Some(match api_key {
                    Some(key) => config.with_api_key(key.clone()),
                    None => config,
                })
            }
            DataSource::Dataset(_) => None,
        }
    }
}

/// Runtime configuration of the API service.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// `None` when neither a store URL nor a dataset path is configured.
    pub source: Option<DataSource>,
    pub base_path: String,
    pub port: u16,
}

impl ServiceConfig {
    /// Read the configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through `lookup`; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let timeout = var("PITLANE_STORE_TIMEOUT_SECS")
            .and_then(|secs| secs.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);

        let source = match var("PITLANE_STORE_URL") {
            Some(url) => Some(DataSource::Rest {
                url,
                api_key: var("PITLANE_STORE_KEY"),
                timeout,
            }),
            None => var("PITLANE_DATASET_PATH").map(|path| DataSource::Dataset(PathBuf::from(path))),
        };

        let base_path = lookup("PITLANE_BASE_PATH")
            .map(|path| normalize_base_path(&path))
            .unwrap_or_else(|| DEFAULT_BASE_PATH.to_string());

        let port = var("SERVICE_PORT")
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(DEFAULT_PORT);

        Self {
            source,
            base_path,
            port,
        }
    }
}

/// Canonical mount prefix: a leading slash, no trailing slash, and the empty
/// string for the root.
pub fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}
