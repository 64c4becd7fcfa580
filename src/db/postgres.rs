//! Durable `PostgreSQL` store.
//!
//! Each trait method is a single statement (or one transaction for the
//! highscore trim), so the uniqueness constraints on `locations(lat_e2,
//! lng_e2)` and `visitors(visitor_id)` carry the concurrency guarantees:
//! `ON CONFLICT DO NOTHING` decides the first visitor at a key and
//! `UPDATE ... RETURNING` increments without losing updates.

use sqlx::PgPool;
use time::OffsetDateTime;

use super::StoreError;
use crate::geo::GroupingKey;
use crate::services::highscore::{Game, HighscoreEntry, HighscoreStore};
use crate::services::identity::VisitorId;
use crate::services::visits::{LocationRecord, VisitStore};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

#[async_trait::async_trait]
impl VisitStore for PgStore {
    async fn visitor_key(&self, visitor: &VisitorId) -> Result<Option<GroupingKey>, StoreError> {
        let row = sqlx::query_as::<_, (i32, i32)>("SELECT lat_e2, lng_e2 FROM visitors WHERE visitor_id = $1")
            .bind(visitor.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(lat_e2, lng_e2)| GroupingKey::from_parts(lat_e2, lng_e2)))
    }

    async fn location_count(&self, key: GroupingKey) -> Result<Option<i64>, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT visitor_count FROM locations WHERE lat_e2 = $1 AND lng_e2 = $2",
        )
        .bind(key.lat_e2())
        .bind(key.lng_e2())
        .fetch_optional(&self.pool)
        .await?;
        Ok(count)
    }

    async fn create_location(&self, key: GroupingKey, lat: f64, lng: f64) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r"INSERT INTO locations (lat, lng, lat_e2, lng_e2, visitor_count)
              VALUES ($1, $2, $3, $4, 1)
              ON CONFLICT (lat_e2, lng_e2) DO NOTHING",
        )
        .bind(lat)
        .bind(lng)
        .bind(key.lat_e2())
        .bind(key.lng_e2())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn increment_location(&self, key: GroupingKey) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            r"UPDATE locations SET visitor_count = visitor_count + 1
              WHERE lat_e2 = $1 AND lng_e2 = $2
              RETURNING visitor_count",
        )
        .bind(key.lat_e2())
        .bind(key.lng_e2())
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn upsert_visitor(&self, visitor: &VisitorId, key: GroupingKey) -> Result<(), StoreError> {
        sqlx::query(
            r"INSERT INTO visitors (visitor_id, lat_e2, lng_e2)
              VALUES ($1, $2, $3)
              ON CONFLICT (visitor_id) DO UPDATE
              SET lat_e2 = EXCLUDED.lat_e2, lng_e2 = EXCLUDED.lng_e2, updated_at = now()",
        )
        .bind(visitor.as_str())
        .bind(key.lat_e2())
        .bind(key.lng_e2())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_locations(&self) -> Result<Vec<LocationRecord>, StoreError> {
        let rows = sqlx::query_as::<_, (f64, f64, OffsetDateTime)>(
            "SELECT lat, lng, created_at FROM locations ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(lat, lng, timestamp)| LocationRecord { lat, lng, timestamp })
            .collect())
    }
}

#[async_trait::async_trait]
impl HighscoreStore for PgStore {
    async fn top_scores(&self, game: Game, limit: usize) -> Result<Vec<HighscoreEntry>, StoreError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            r"SELECT name, score FROM highscores
              WHERE game = $1
              ORDER BY score DESC, id ASC
              LIMIT $2",
        )
        .bind(game.as_str())
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(name, score)| HighscoreEntry { game, name, score })
            .collect())
    }

    async fn insert_and_trim(&self, entry: HighscoreEntry, keep: usize) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT INTO highscores (game, name, score) VALUES ($1, $2, $3)")
            .bind(entry.game.as_str())
            .bind(&entry.name)
            .bind(entry.score)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            r"DELETE FROM highscores
              WHERE game = $1 AND id NOT IN (
                  SELECT id FROM highscores
                  WHERE game = $1
                  ORDER BY score DESC, id ASC
                  LIMIT $2
              )",
        )
        .bind(entry.game.as_str())
        .bind(sql_limit(keep))
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(all(test, feature = "live-db-tests"))]
#[path = "postgres_test.rs"]
mod tests;
