//! Application state for the HTTP service.
//!
//! Holds the one data client built at start-up, the route table and the
//! mount prefix. Handlers receive it through axum's `State` extractor.

use std::path::Path;
use std::sync::Arc;

use pitlane_lib::{DataClient, Error as LibError, MemoryStore, RestClient};

use crate::config::{normalize_base_path, DataSource, ServiceConfig, DEFAULT_BASE_PATH};
use crate::routes::{RouteTable, Shadowed};

/// Error during application state initialization.
#[derive(Debug)]
pub enum AppStateError {
    /// Neither a store URL nor a dataset path was configured.
    MissingDataSource,

    /// The REST client could not be built.
    Client(LibError),

    /// The dataset file could not be loaded.
    Dataset(LibError),

    /// Some routes can never match.
    ShadowedRoutes(Vec<Shadowed>),
}

impl std::fmt::Display for AppStateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingDataSource => write!(
                f,
                "no data source configured: set PITLANE_STORE_URL or PITLANE_DATASET_PATH"
            ),
            Self::Client(e) => write!(f, "failed to build data service client: {}", e),
            Self::Dataset(e) => write!(f, "failed to load dataset: {}", e),
            Self::ShadowedRoutes(routes) => {
                let list: Vec<String> = routes.iter().map(ToString::to_string).collect();
                write!(f, "route table has unreachable routes: {}", list.join("; "))
            }
        }
    }
}

impl std::error::Error for AppStateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Client(e) | Self::Dataset(e) => Some(e),
            _ => None,
        }
    }
}

/// Shared application state for all axum handlers.
///
/// Cheap to clone; all clones share the same client and route table.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    client: Arc<dyn DataClient>,
    routes: RouteTable,
    base_path: String,
    backend: &'static str,
}

impl AppState {
    /// Build state around an existing client, with the standard route table
    /// mounted under `/api`.
    pub fn new(client: Arc<dyn DataClient>) -> Self {
        Self::with_parts(client, RouteTable::standard(), DEFAULT_BASE_PATH, "custom")
    }

    fn with_parts(
        client: Arc<dyn DataClient>,
        routes: RouteTable,
        base_path: &str,
        backend: &'static str,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                client,
                routes,
                base_path: normalize_base_path(base_path),
                backend,
            }),
        }
    }

    /// Same client and routes, mounted under `base_path`.
    pub fn with_base_path(&self, base_path: &str) -> Self {
        Self::with_parts(
            Arc::clone(&self.inner.client),
            self.inner.routes.clone(),
            base_path,
            self.inner.backend,
        )
    }

    /// Serve a JSON dataset file from memory.
    pub fn load(dataset_path: impl AsRef<Path>) -> Result<Self, AppStateError> {
        let store = MemoryStore::load(dataset_path).map_err(AppStateError::Dataset)?;
        Ok(Self::with_parts(
            Arc::new(store),
            RouteTable::standard(),
            DEFAULT_BASE_PATH,
            "memory",
        ))
    }

    /// Build state from the service configuration and validate the routes.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, AppStateError> {
        let state = match &config.source {
            None => return Err(AppStateError::MissingDataSource),
            Some(DataSource::Dataset(path)) => Self::load(path)?,
            Some(source) => {
                let rest = source
                    .rest_config()
                    .ok_or(AppStateError::MissingDataSource)?;
                tracing::info!(url = %rest.base_url, "using data service");
                let client = RestClient::new(rest).map_err(AppStateError::Client)?;
                Self::with_parts(
                    Arc::new(client),
                    RouteTable::standard(),
                    DEFAULT_BASE_PATH,
                    "rest",
                )
            }
        }
        .with_base_path(&config.base_path);

        state.validate()?;
        Ok(state)
    }

    /// Fail when the route table contains unreachable routes.
    pub fn validate(&self) -> Result<(), AppStateError> {
        let shadowed = self.inner.routes.shadowed();
        if shadowed.is_empty() {
            Ok(())
        } else {
            Err(AppStateError::ShadowedRoutes(shadowed))
        }
    }

    pub fn client(&self) -> &dyn DataClient {
        self.inner.client.as_ref()
    }

    pub fn routes(&self) -> &RouteTable {
        &self.inner.routes
    }

    /// Mount prefix of the route table; empty for the root.
    pub fn base_path(&self) -> &str {
        &self.inner.base_path
    }

    /// Kind of data client in use: `rest`, `memory` or `custom`.
    pub fn backend(&self) -> &'static str {
        self.inner.backend
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("backend", &self.inner.backend)
            .field("base_path", &self.inner.base_path)
            .field("routes", &self.inner.routes.routes().len())
            .finish()
    }
}
