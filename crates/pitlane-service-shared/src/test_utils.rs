//! Test utilities for handler and router testing.
//!
//! Provides the fixture dataset, a shared state loaded from it and helpers
//! for building state around a specific store (for counting data-access
//! calls or injecting failures).

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use pitlane_lib::MemoryStore;

use crate::state::AppState;

/// Path to the JSON fixture dataset.
pub const TEST_FIXTURE_PATH: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../../docs/fixtures/minimal_dataset.json"
);

static TEST_STATE: OnceLock<AppState> = OnceLock::new();

/// Get a shared test AppState serving the fixture dataset under `/api`.
///
/// # Panics
///
/// Panics if the fixture cannot be loaded.
pub fn test_state() -> AppState {
    TEST_STATE
        .get_or_init(|| {
            let path = fixture_path();
            AppState::load(&path)
                .unwrap_or_else(|e| panic!("failed to load test fixture from {:?}: {}", path, e))
        })
        .clone()
}

/// Absolute path of the fixture dataset.
pub fn fixture_path() -> PathBuf {
    PathBuf::from(TEST_FIXTURE_PATH)
}

/// A fresh store over the fixture dataset, with its own call counter.
pub fn fixture_store() -> Arc<MemoryStore> {
    let path = fixture_path();
    Arc::new(
        MemoryStore::load(&path)
            .unwrap_or_else(|e| panic!("failed to load test fixture from {:?}: {}", path, e)),
    )
}

/// State around `store`, mounted under `/api`.
pub fn state_with(store: Arc<MemoryStore>) -> AppState {
    AppState::new(store)
}

/// References known to exist in the fixture.
pub mod fixture_refs {
    /// Race with results, qualifying and standings.
    pub const RACE_WITH_RESULTS: &str = "18";

    /// Race with no results rows.
    pub const RACE_WITHOUT_RESULTS: &str = "2";

    /// Driver ref with results in 2006 and 2007.
    pub const DRIVER_REF: &str = "alonso";

    /// Circuit ref of circuit 1.
    pub const CIRCUIT_REF: &str = "albert_park";
}

/// Generate a unique request ID for testing.
pub fn test_request_id() -> String {
    format!("test-{}", uuid::Uuid::now_v7())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_path_exists() {
        let path = fixture_path();
        assert!(path.exists(), "fixture dataset not found at {:?}", path);
    }

    #[test]
    fn test_state_loads_successfully() {
        let state = test_state();
        assert_eq!(state.backend(), "memory");
        assert_eq!(state.base_path(), "/api");
    }

    #[test]
    fn test_fixture_store_starts_uncounted() {
        let store = fixture_store();
        assert!(store.row_count() > 0);
        assert_eq!(store.calls(), 0);
    }

    #[test]
    fn test_request_id_unique() {
        let id1 = test_request_id();
        let id2 = test_request_id();
        assert_ne!(id1, id2);
    }
}
