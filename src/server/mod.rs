pub mod routes;
pub mod ws;

use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route("/api/picks", get(routes::list_picks).post(routes::create_pick))
        .route(
            "/api/picks/{id}",
            get(routes::get_pick)
                .patch(routes::edit_pick)
                .delete(routes::delete_pick),
        )
        .route("/api/picks/{id}/settle", post(routes::settle_pick))
        .route("/api/picks/{id}/reverse", post(routes::reverse_pick))
        .route("/api/metrics", get(routes::get_metrics))
        .route("/api/counters", get(routes::get_counters))
        .route("/ws", get(ws::ws_handler));

    if state.config.cors_allow_any {
        app = app.layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        );
    }

    app.with_state(state)
}
