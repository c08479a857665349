use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use crate::state::ReplayState;

pub fn create_router(state: Arc<ReplayState>) -> Router {
    Router::new()
        // Feed endpoints, path-identical to the live API so display
        // collaborators are source-agnostic.
        .route("/live/feeds/live-feed.json", get(super::handlers::live_feed))
        .route(
            "/live/feeds/live-flag-data.json",
            get(super::handlers::flag_data),
        )
        .route(
            "/live/feeds/live-pit-data.json",
            get(super::handlers::pit_data),
        )
        .route(
            "/live/feeds/live-points.json",
            get(super::handlers::points_data),
        )
        .route(
            "/live/feeds/live-stage-points.json",
            get(super::handlers::stage_points),
        )
        // Replay controls
        .route("/replay/status", get(super::handlers::replay_status))
        .route("/replay/play", post(super::handlers::replay_play))
        .route("/replay/pause", post(super::handlers::replay_pause))
        .route("/replay/stop", post(super::handlers::replay_stop))
        .route("/replay/seek", get(super::handlers::replay_seek))
        .route("/replay/speed", get(super::handlers::replay_speed))
        .route("/replay/loop", post(super::handlers::replay_loop))
        // Health check
        .route("/health", get(super::handlers::health_check))
        .with_state(state)
        // CORS for the browser control UI
        .layer(CorsLayer::permissive())
}
