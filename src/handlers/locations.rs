// src/handlers/locations.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    common::error::AppError,
    config::AppState,
    handlers::{empty_as_none, ApiResponse},
    models::location::{LocationLevel, LocationNode},
};

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct LocationQuery {
    /// Obrigatório em todos os níveis, exceto `country` e `branch`.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub parent_id: Option<i64>,
}

// GET /api/locations/{level}
#[utoipa::path(
    get,
    path = "/api/locations/{level}",
    tag = "Locations",
    params(
        ("level" = LocationLevel, Path, description = "Nível da cascata"),
        LocationQuery
    ),
    responses(
        (status = 200, description = "Opções do nível", body = ApiResponse<Vec<LocationNode>>),
        (status = 400, description = "parentId ausente ou indevido")
    )
)]
pub async fn list_locations(
    State(app_state): State<AppState>,
    Path(level): Path<LocationLevel>,
    Query(query): Query<LocationQuery>,
) -> Result<impl IntoResponse, AppError> {
    let nodes = app_state
        .location_service
        .children(level, query.parent_id)
        .await?;

    Ok((StatusCode::OK, Json(ApiResponse::ok(nodes))))
}
