//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the one hub for the process, the two store handles and the parsed
//! config. Stores are trait objects so the same handlers run against
//! Postgres in production and `MemoryStore` without a database.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::db::{MemoryStore, PgStore};
use crate::services::highscore::HighscoreStore;
use crate::services::hub::Hub;
use crate::services::visits::VisitStore;

/// Clone is required by Axum; every field is Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<Hub>,
    pub visits: Arc<dyn VisitStore>,
    pub highscores: Arc<dyn HighscoreStore>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(
        config: ServerConfig,
        visits: Arc<dyn VisitStore>,
        highscores: Arc<dyn HighscoreStore>,
    ) -> Self {
        let hub = Arc::new(Hub::new(config.hub));
        Self { hub, visits, highscores, config: Arc::new(config) }
    }

    /// State backed by a Postgres pool for both stores.
    #[must_use]
    pub fn with_postgres(config: ServerConfig, store: PgStore) -> Self {
        let store = Arc::new(store);
        Self::new(config, store.clone(), store)
    }

    /// State backed by a fresh in-memory store.
    #[must_use]
    pub fn in_memory(config: ServerConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::new(config, store.clone(), store)
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
