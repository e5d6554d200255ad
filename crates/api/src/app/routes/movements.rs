use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use stockroom_core::MovementId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_movements).post(record_movement))
        .route("/:id", get(get_movement).put(update_movement).delete(delete_movement))
}

pub async fn record_movement(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::RecordMovementRequest>,
) -> axum::response::Response {
    let cmd = match body.into_command() {
        Ok(cmd) => cmd,
        Err(resp) => return resp,
    };
    match services.catalog.record_movement(cmd).await {
        Ok(movement) => {
            (StatusCode::CREATED, Json(dto::movement_to_json(&movement, None))).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Most recently modified first; optional `product_id` and `action` filters.
pub async fn list_movements(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::MovementListQuery>,
) -> axum::response::Response {
    let filter = match query.into_filter() {
        Ok(f) => f,
        Err(resp) => return resp,
    };
    match services.catalog.list_movements(&filter).await {
        Ok(movements) => {
            let items = movements
                .iter()
                .map(|m| dto::movement_to_json(m, None))
                .collect::<Vec<_>>();
            (
                StatusCode::OK,
                Json(serde_json::json!({ "items": items, "meta": dto::movement_meta() })),
            )
                .into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_movement(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let movement_id: MovementId = match errors::parse_id(&id, "movement") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let movement = match services.catalog.get_movement(movement_id).await {
        Ok(m) => m,
        Err(e) => return errors::service_error_to_response(e),
    };
    // The owner may have been removed between the two reads; omit `display` then.
    let owner = services.catalog.get_product(movement.product_id()).await.ok();
    let body = dto::movement_to_json(&movement, owner.as_ref().map(|p| p.name()));
    (StatusCode::OK, Json(body)).into_response()
}

pub async fn update_movement(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateMovementRequest>,
) -> axum::response::Response {
    let movement_id: MovementId = match errors::parse_id(&id, "movement") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let cmd = match body.into_command() {
        Ok(cmd) => cmd,
        Err(resp) => return resp,
    };
    match services.catalog.update_movement(movement_id, cmd).await {
        Ok(movement) => (StatusCode::OK, Json(dto::movement_to_json(&movement, None))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_movement(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let movement_id: MovementId = match errors::parse_id(&id, "movement") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.catalog.delete_movement(movement_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
