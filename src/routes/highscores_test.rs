use super::*;
use crate::db::StoreError;
use crate::services::highscore::PLACEHOLDER_NAME;
use crate::state::test_helpers;

fn query(game: Option<&str>) -> Query<HighscoreQuery> {
    Query(HighscoreQuery { game: game.map(str::to_owned) })
}

fn submission(game: &str, name: &str, score: i64) -> Json<SubmitHighscore> {
    Json(SubmitHighscore { game: game.into(), name: name.into(), score })
}

#[tokio::test]
async fn get_pads_empty_board_to_five() {
    let state = test_helpers::test_app_state();
    let Json(board) = get_highscores(State(state), query(Some("snake"))).await.unwrap();
    assert_eq!(board.len(), 5);
    assert!(board.iter().all(|e| e.name == PLACEHOLDER_NAME && e.score == 0));
}

#[tokio::test]
async fn get_requires_game_parameter() {
    let state = test_helpers::test_app_state();
    let err = get_highscores(State(state.clone()), query(None)).await.unwrap_err();
    assert_eq!(err, (StatusCode::BAD_REQUEST, "missing game parameter"));
    let err = get_highscores(State(state), query(Some("  "))).await.unwrap_err();
    assert_eq!(err.0, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_rejects_unknown_game() {
    let state = test_helpers::test_app_state();
    let err = get_highscores(State(state), query(Some("frogger"))).await.unwrap_err();
    assert_eq!(err, (StatusCode::BAD_REQUEST, "invalid game"));
}

#[tokio::test]
async fn submit_returns_updated_board_with_capped_score() {
    let state = test_helpers::test_app_state();
    let Json(board) = submit_highscore(State(state.clone()), submission("tetris", "max", 1_500_000))
        .await
        .unwrap();
    assert_eq!(board[0], HighscoreEntry { game: Game::Tetris, name: "MAX".into(), score: 999_999 });
    assert_eq!(board.len(), 5);

    let Json(read_back) = get_highscores(State(state), query(Some("TETRIS"))).await.unwrap();
    assert_eq!(read_back, board);
}

#[tokio::test]
async fn submit_rejects_negative_score_and_unknown_game() {
    let state = test_helpers::test_app_state();
    let err = submit_highscore(State(state.clone()), submission("pong", "neg", -1)).await.unwrap_err();
    assert_eq!(err, (StatusCode::BAD_REQUEST, "invalid score"));

    let err = submit_highscore(State(state), submission("chess", "abc", 10)).await.unwrap_err();
    assert_eq!(err, (StatusCode::BAD_REQUEST, "invalid game"));
}

#[test]
fn storage_error_maps_to_internal_error() {
    let err = HighscoreError::Storage(StoreError::Database(sqlx::Error::PoolTimedOut));
    assert_eq!(highscore_error_to_status(&err).0, StatusCode::INTERNAL_SERVER_ERROR);
}
