//! Arcade leaderboard endpoints.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use tracing::error;

use crate::services::highscore::{self, Game, HighscoreEntry, HighscoreError};
use crate::state::AppState;

type ApiError = (StatusCode, &'static str);

#[derive(Debug, Deserialize)]
pub struct HighscoreQuery {
    pub game: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitHighscore {
    pub game: String,
    #[serde(default)]
    pub name: String,
    pub score: i64,
}

pub(crate) fn highscore_error_to_status(err: &HighscoreError) -> ApiError {
    match err {
        HighscoreError::UnknownGame(_) => (StatusCode::BAD_REQUEST, "invalid game"),
        HighscoreError::NegativeScore(_) => (StatusCode::BAD_REQUEST, "invalid score"),
        HighscoreError::Storage(e) => {
            error!(error = %e, "api: highscore storage failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
        }
    }
}

/// `GET /api/highscores?game=G`: exactly five entries, best first.
pub async fn get_highscores(
    State(state): State<AppState>,
    Query(query): Query<HighscoreQuery>,
) -> Result<Json<Vec<HighscoreEntry>>, ApiError> {
    let raw = query
        .game
        .filter(|g| !g.trim().is_empty())
        .ok_or((StatusCode::BAD_REQUEST, "missing game parameter"))?;
    let game: Game = raw.parse().map_err(|e| highscore_error_to_status(&e))?;

    highscore::leaderboard(state.highscores.as_ref(), game)
        .await
        .map(Json)
        .map_err(|e| highscore_error_to_status(&e))
}

/// `POST /api/highscore`: store a score and return the updated leaderboard.
pub async fn submit_highscore(
    State(state): State<AppState>,
    Json(req): Json<SubmitHighscore>,
) -> Result<Json<Vec<HighscoreEntry>>, ApiError> {
    let game: Game = req.game.parse().map_err(|e| highscore_error_to_status(&e))?;

    highscore::submit_score(state.highscores.as_ref(), game, &req.name, req.score)
        .await
        .map(Json)
        .map_err(|e| highscore_error_to_status(&e))
}

#[cfg(test)]
#[path = "highscores_test.rs"]
mod tests;
