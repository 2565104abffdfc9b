use crate::interface_adapters::net::{
    add_floor_handler, add_map_handler, list_maps_handler, remove_map_handler, round_handler,
    set_death_height_handler, set_spawn_handler, set_waiting_map_handler,
    shorten_countdown_handler, stats_handler, ws_handler,
};
use crate::interface_adapters::state::AppState;

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use std::sync::Arc;

// Host sockets plus the read-only and operator HTTP routes.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/round", get(round_handler))
        .route("/stats/{player_id}", get(stats_handler))
        .route("/countdown/shorten", post(shorten_countdown_handler))
        .route("/maps", get(list_maps_handler).post(add_map_handler))
        .route("/maps/{name}", delete(remove_map_handler))
        .route("/maps/{name}/spawn", put(set_spawn_handler))
        .route("/maps/{name}/death-height", put(set_death_height_handler))
        .route("/maps/{name}/floors", post(add_floor_handler))
        .route("/waiting-map", put(set_waiting_map_handler))
        .with_state(state)
}
