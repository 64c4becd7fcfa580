//! Visitor and location accounting.
//!
//! DESIGN
//! ======
//! Each browser carries an opaque visitor id. A location report is clustered
//! onto a `GroupingKey` and counted once per visitor per key:
//!
//! 1. Same visitor, same key as last time: read the count, change nothing.
//! 2. Otherwise insert-or-ignore the location row. Winning the insert means
//!    this visitor is the first at that key (count 1); losing it means the key
//!    already exists and its count is atomically incremented.
//! 3. Point the visitor at the new key.
//!
//! Counts are cumulative footfall. Moving to a new key never decrements the
//! previous one, and coming back to an old key counts again.
//!
//! INVARIANTS
//! ==========
//! - At most one location row per key and one visitor row per id.
//! - Concurrent first visits to the same key produce exactly one `is_first`;
//!   every other caller increments, so no visit is lost.

use serde::Serialize;
use time::OffsetDateTime;
use tracing::info;

use crate::db::StoreError;
use crate::geo::{GroupingKey, is_valid_coordinate};
use crate::services::identity::VisitorId;

/// Result of one location report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitOutcome {
    pub added: bool,
    pub is_first: bool,
    pub visitor_count: i64,
}

/// One clustered location: raw coordinates of its first observation and
/// when that happened.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationRecord {
    pub lat: f64,
    pub lng: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

#[derive(Debug, thiserror::Error)]
pub enum VisitError {
    #[error("coordinates out of range: ({lat}, {lng})")]
    InvalidCoordinates { lat: f64, lng: f64 },
    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Storage primitives for the visitor ledger and location aggregates.
///
/// Every method must be atomic on its own; `record_visit` composes them
/// without an enclosing transaction.
#[async_trait::async_trait]
pub trait VisitStore: Send + Sync {
    /// Key the visitor last registered at, if any.
    async fn visitor_key(&self, visitor: &VisitorId) -> Result<Option<GroupingKey>, StoreError>;

    /// Current count at `key`, if the location exists.
    async fn location_count(&self, key: GroupingKey) -> Result<Option<i64>, StoreError>;

    /// Insert `key` with count 1 unless it already exists. Returns `true` when
    /// this call created the row.
    async fn create_location(&self, key: GroupingKey, lat: f64, lng: f64) -> Result<bool, StoreError>;

    /// Add one to the count at `key` and return the new value.
    async fn increment_location(&self, key: GroupingKey) -> Result<i64, StoreError>;

    /// Create or repoint the visitor's ledger entry.
    async fn upsert_visitor(&self, visitor: &VisitorId, key: GroupingKey) -> Result<(), StoreError>;

    /// Every location, oldest first.
    async fn list_locations(&self) -> Result<Vec<LocationRecord>, StoreError>;
}

/// Count a visit from `visitor` at `(lat, lng)`.
///
/// # Errors
///
/// `InvalidCoordinates` for out-of-range or NaN input (nothing is written),
/// `Storage` when a store primitive fails.
pub async fn record_visit(
    store: &dyn VisitStore,
    lat: f64,
    lng: f64,
    visitor: &VisitorId,
) -> Result<VisitOutcome, VisitError> {
    if !is_valid_coordinate(lat, lng) {
        return Err(VisitError::InvalidCoordinates { lat, lng });
    }
    let key = GroupingKey::from_coords(lat, lng);

    if store.visitor_key(visitor).await? == Some(key) {
        let visitor_count = store.location_count(key).await?.unwrap_or(0);
        return Ok(VisitOutcome { added: false, is_first: false, visitor_count });
    }

    let outcome = if store.create_location(key, lat, lng).await? {
        VisitOutcome { added: true, is_first: true, visitor_count: 1 }
    } else {
        let visitor_count = store.increment_location(key).await?;
        VisitOutcome { added: false, is_first: false, visitor_count }
    };
    store.upsert_visitor(visitor, key).await?;

    info!(%key, visitor_count = outcome.visitor_count, first = outcome.is_first, "api: visit recorded");
    Ok(outcome)
}

/// All known locations for the globe view.
///
/// # Errors
///
/// Propagates the store failure.
pub async fn list_locations(store: &dyn VisitStore) -> Result<Vec<LocationRecord>, VisitError> {
    Ok(store.list_locations().await?)
}

#[cfg(test)]
#[path = "visits_test.rs"]
mod tests;
