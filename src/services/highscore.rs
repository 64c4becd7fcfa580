//! Arcade leaderboards.
//!
//! Each game keeps its five best scores. Reads always return exactly five
//! entries, padded with `CON` / 0 placeholders.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::StoreError;

pub const MAX_SCORE: i64 = 999_999;
pub const LEADERBOARD_SIZE: usize = 5;
pub const NAME_LEN: usize = 3;
pub const PLACEHOLDER_NAME: &str = "CON";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Game {
    Snake,
    Tetris,
    Asteroids,
    Pong,
}

impl Game {
    pub const ALL: [Self; 4] = [Self::Snake, Self::Tetris, Self::Asteroids, Self::Pong];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Snake => "SNAKE",
            Self::Tetris => "TETRIS",
            Self::Asteroids => "ASTEROIDS",
            Self::Pong => "PONG",
        }
    }
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Game {
    type Err = HighscoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|game| game.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| HighscoreError::UnknownGame(s.to_owned()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HighscoreEntry {
    pub game: Game,
    pub name: String,
    pub score: i64,
}

impl HighscoreEntry {
    fn placeholder(game: Game) -> Self {
        Self { game, name: PLACEHOLDER_NAME.to_owned(), score: 0 }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HighscoreError {
    #[error("unknown game: {0}")]
    UnknownGame(String),
    #[error("score must not be negative: {0}")]
    NegativeScore(i64),
    #[error(transparent)]
    Storage(#[from] StoreError),
}

#[async_trait::async_trait]
pub trait HighscoreStore: Send + Sync {
    /// Up to `limit` entries for `game`, best first; ties keep insertion order.
    async fn top_scores(&self, game: Game, limit: usize) -> Result<Vec<HighscoreEntry>, StoreError>;

    /// Insert one entry, then delete everything for its game outside the top `keep`.
    async fn insert_and_trim(&self, entry: HighscoreEntry, keep: usize) -> Result<(), StoreError>;
}

/// Upper-case, cut to three characters and right-pad with spaces.
#[must_use]
pub fn sanitize_name(raw: &str) -> String {
    let mut name: String = raw.to_uppercase().chars().take(NAME_LEN).collect();
    while name.chars().count() < NAME_LEN {
        name.push(' ');
    }
    name
}

/// Reject negative scores and cap the rest at `MAX_SCORE`.
///
/// # Errors
///
/// `NegativeScore` when `score < 0`.
pub fn clamp_score(score: i64) -> Result<i64, HighscoreError> {
    if score < 0 {
        return Err(HighscoreError::NegativeScore(score));
    }
    Ok(score.min(MAX_SCORE))
}

/// Exactly `LEADERBOARD_SIZE` entries for `game`.
///
/// # Errors
///
/// Propagates the store failure.
pub async fn leaderboard(store: &dyn HighscoreStore, game: Game) -> Result<Vec<HighscoreEntry>, HighscoreError> {
    let mut entries = store.top_scores(game, LEADERBOARD_SIZE).await?;
    entries.truncate(LEADERBOARD_SIZE);
    entries.resize_with(LEADERBOARD_SIZE, || HighscoreEntry::placeholder(game));
    Ok(entries)
}

/// Validate and store a score, returning the updated leaderboard.
///
/// # Errors
///
/// `NegativeScore` before anything is written, `Storage` on store failure.
pub async fn submit_score(
    store: &dyn HighscoreStore,
    game: Game,
    name: &str,
    score: i64,
) -> Result<Vec<HighscoreEntry>, HighscoreError> {
    let score = clamp_score(score)?;
    let entry = HighscoreEntry { game, name: sanitize_name(name), score };
    info!(%game, name = %entry.name, score, "api: highscore submitted");
    store.insert_and_trim(entry, LEADERBOARD_SIZE).await?;
    leaderboard(store, game).await
}

#[cfg(test)]
#[path = "highscore_test.rs"]
mod tests;
