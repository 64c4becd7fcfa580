use super::*;
use crate::config::HubConfig;
use crate::services::highscore::{Game, leaderboard};
use crate::services::identity::VisitorId;
use crate::services::visits::record_visit;

#[tokio::test]
async fn new_state_has_empty_running_hub() {
    let state = test_helpers::test_app_state();
    assert!(state.hub.is_running().await);
    assert_eq!(state.hub.viewer_count().await, 0);
}

#[tokio::test]
async fn clones_share_the_same_hub_and_stores() {
    let state = test_helpers::test_app_state();
    let clone = state.clone();
    assert!(Arc::ptr_eq(&state.hub, &clone.hub));

    let visitor = VisitorId::generate();
    record_visit(state.visits.as_ref(), 10.0, 20.0, &visitor).await.unwrap();
    assert_eq!(clone.visits.list_locations().await.unwrap().len(), 1);
}

#[tokio::test]
async fn hub_is_built_from_config() {
    let config = ServerConfig { hub: HubConfig { queue_capacity: 4, ping_history: 0 }, ..ServerConfig::default() };
    let state = test_helpers::test_app_state_with(config);
    assert_eq!(state.config.hub.queue_capacity, 4);
    assert!(state.hub.recent_pings().await.is_empty());
}

#[tokio::test]
async fn in_memory_highscores_start_padded() {
    let state = test_helpers::test_app_state();
    let board = leaderboard(state.highscores.as_ref(), Game::Snake).await.unwrap();
    assert_eq!(board.len(), 5);
}
