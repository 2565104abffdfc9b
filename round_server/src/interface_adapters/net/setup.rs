// Operator routes for the map file: pool, waiting map, spawn points, death heights, floors.

use crate::domain::errors::MapConfigError;
use crate::domain::{FloorLayer, Spawn};
use crate::interface_adapters::http::error_response;
use crate::interface_adapters::maps::{MapsDocument, TomlMapRegistry};
use crate::interface_adapters::state::AppState;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Deserialize)]
pub struct MapNameRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct DeathHeightRequest {
    pub death_height: i32,
}

pub async fn list_maps_handler(State(state): State<Arc<AppState>>) -> Json<MapsDocument> {
    Json(state.maps.document())
}

pub async fn add_map_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MapNameRequest>,
) -> Response {
    let Some(name) = valid_name(&request.name) else {
        return error_response(StatusCode::BAD_REQUEST, "map name is required");
    };
    apply(&state, StatusCode::CREATED, |maps| maps.add_map(name)).await
}

pub async fn remove_map_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Response {
    apply(&state, StatusCode::NO_CONTENT, |maps| maps.remove_map(&name)).await
}

pub async fn set_waiting_map_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MapNameRequest>,
) -> Response {
    let Some(name) = valid_name(&request.name) else {
        return error_response(StatusCode::BAD_REQUEST, "map name is required");
    };
    apply(&state, StatusCode::NO_CONTENT, |maps| {
        maps.set_waiting_map(name);
        Ok(())
    })
    .await
}

pub async fn set_spawn_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(spawn): Json<Spawn>,
) -> Response {
    if !spawn.yaw.is_finite() || !spawn.pitch.is_finite() {
        return error_response(StatusCode::BAD_REQUEST, "spawn angles must be finite");
    }
    apply(&state, StatusCode::NO_CONTENT, |maps| maps.set_spawn(&name, spawn)).await
}

pub async fn set_death_height_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(request): Json<DeathHeightRequest>,
) -> Response {
    apply(&state, StatusCode::NO_CONTENT, |maps| {
        maps.set_death_height(&name, request.death_height)
    })
    .await
}

pub async fn add_floor_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(layer): Json<FloorLayer>,
) -> Response {
    apply(&state, StatusCode::NO_CONTENT, |maps| maps.add_floor(&name, layer)).await
}

fn valid_name(raw: &str) -> Option<&str> {
    let name = raw.trim();
    (!name.is_empty()).then_some(name)
}

// Applies one edit in memory, then writes the whole file off the async runtime.
async fn apply(
    state: &Arc<AppState>,
    success: StatusCode,
    edit: impl FnOnce(&TomlMapRegistry) -> Result<(), MapConfigError>,
) -> Response {
    if let Err(e) = edit(&state.maps) {
        return config_error_response(e);
    }

    let maps = state.maps.clone();
    match tokio::task::spawn_blocking(move || maps.save()).await {
        Ok(Ok(())) => {
            info!("map config saved");
            success.into_response()
        }
        Ok(Err(e)) => config_error_response(e),
        Err(e) => {
            error!(error = %e, "map config save task failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to save map config")
        }
    }
}

fn config_error_response(error: MapConfigError) -> Response {
    match error {
        MapConfigError::DuplicateMap(_) => error_response(StatusCode::CONFLICT, error.to_string()),
        MapConfigError::UnknownMap(_) => error_response(StatusCode::NOT_FOUND, error.to_string()),
        MapConfigError::Io { .. } | MapConfigError::Parse(_) | MapConfigError::Encode(_) => {
            error!(%error, "map config write failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to save map config")
        }
    }
}
