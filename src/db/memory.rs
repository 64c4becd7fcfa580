//! In-process store used when no database is configured, and in tests.
//!
//! One mutex guards all tables, so every trait method is trivially atomic.
//! Nothing survives a restart.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use time::OffsetDateTime;

use super::StoreError;
use crate::geo::GroupingKey;
use crate::services::highscore::{Game, HighscoreEntry, HighscoreStore};
use crate::services::identity::VisitorId;
use crate::services::visits::{LocationRecord, VisitStore};

struct LocationRow {
    seq: u64,
    lat: f64,
    lng: f64,
    visitor_count: i64,
    created_at: OffsetDateTime,
}

struct ScoreRow {
    seq: u64,
    name: String,
    score: i64,
}

#[derive(Default)]
struct Tables {
    next_seq: u64,
    locations: HashMap<GroupingKey, LocationRow>,
    visitors: HashMap<VisitorId, GroupingKey>,
    highscores: HashMap<Game, Vec<ScoreRow>>,
}

impl Tables {
    fn seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl VisitStore for MemoryStore {
    async fn visitor_key(&self, visitor: &VisitorId) -> Result<Option<GroupingKey>, StoreError> {
        Ok(self.lock().visitors.get(visitor).copied())
    }

    async fn location_count(&self, key: GroupingKey) -> Result<Option<i64>, StoreError> {
        Ok(self.lock().locations.get(&key).map(|row| row.visitor_count))
    }

    async fn create_location(&self, key: GroupingKey, lat: f64, lng: f64) -> Result<bool, StoreError> {
        let mut tables = self.lock();
        if tables.locations.contains_key(&key) {
            return Ok(false);
        }
        let seq = tables.seq();
        tables.locations.insert(
            key,
            LocationRow { seq, lat, lng, visitor_count: 1, created_at: OffsetDateTime::now_utc() },
        );
        Ok(true)
    }

    async fn increment_location(&self, key: GroupingKey) -> Result<i64, StoreError> {
        let mut tables = self.lock();
        let row = tables.locations.get_mut(&key).ok_or(sqlx::Error::RowNotFound)?;
        row.visitor_count += 1;
        Ok(row.visitor_count)
    }

    async fn upsert_visitor(&self, visitor: &VisitorId, key: GroupingKey) -> Result<(), StoreError> {
        self.lock().visitors.insert(visitor.clone(), key);
        Ok(())
    }

    async fn list_locations(&self) -> Result<Vec<LocationRecord>, StoreError> {
        let tables = self.lock();
        let mut rows: Vec<&LocationRow> = tables.locations.values().collect();
        rows.sort_by_key(|row| row.seq);
        Ok(rows
            .into_iter()
            .map(|row| LocationRecord { lat: row.lat, lng: row.lng, timestamp: row.created_at })
            .collect())
    }
}

#[async_trait::async_trait]
impl HighscoreStore for MemoryStore {
    async fn top_scores(&self, game: Game, limit: usize) -> Result<Vec<HighscoreEntry>, StoreError> {
        let tables = self.lock();
        let Some(rows) = tables.highscores.get(&game) else {
            return Ok(Vec::new());
        };
        Ok(rows
            .iter()
            .take(limit)
            .map(|row| HighscoreEntry { game, name: row.name.clone(), score: row.score })
            .collect())
    }

    async fn insert_and_trim(&self, entry: HighscoreEntry, keep: usize) -> Result<(), StoreError> {
        let mut tables = self.lock();
        let seq = tables.seq();
        let rows = tables.highscores.entry(entry.game).or_default();
        rows.push(ScoreRow { seq, name: entry.name, score: entry.score });
        rows.sort_by(|a, b| b.score.cmp(&a.score).then(a.seq.cmp(&b.seq)));
        rows.truncate(keep);
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
