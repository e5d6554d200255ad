use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use stockroom_core::ProductId;
use stockroom_infra::store::{MovementFilter, ProductQuery};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/:id", get(get_product).put(update_product).delete(delete_product))
        .route("/:id/movements", get(list_product_movements))
        .route("/:id/total", get(get_total))
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateProductRequest>,
) -> axum::response::Response {
    match services.catalog.create_product(body.into_command()).await {
        Ok(product) => (StatusCode::CREATED, Json(dto::product_to_json(&product))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Admin list: name ascending, each row with its warehouse total.
pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<ProductQuery>,
) -> axum::response::Response {
    match services.catalog.product_summaries(&query).await {
        Ok(rows) => {
            let items = rows.iter().map(dto::summary_to_json).collect::<Vec<_>>();
            (
                StatusCode::OK,
                Json(serde_json::json!({ "items": items, "meta": dto::product_meta() })),
            )
                .into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id: ProductId = match errors::parse_id(&id, "product") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.catalog.product_detail(product_id).await {
        Ok(detail) => (StatusCode::OK, Json(dto::detail_to_json(&detail))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Edit form save. Without `movements` only the product fields change; with
/// it, the product and every inline row are saved as one unit.
pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateProductRequest>,
) -> axum::response::Response {
    let product_id: ProductId = match errors::parse_id(&id, "product") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let (cmd, edits) = match body.into_parts() {
        Ok(parts) => parts,
        Err(resp) => return resp,
    };

    let saved = match edits {
        Some(edits) => services.catalog.save_product_form(product_id, cmd, edits).await,
        None => match services.catalog.update_product(product_id, cmd).await {
            Ok(_) => services.catalog.product_detail(product_id).await,
            Err(e) => Err(e),
        },
    };

    match saved {
        Ok(detail) => (StatusCode::OK, Json(dto::detail_to_json(&detail))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id: ProductId = match errors::parse_id(&id, "product") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.catalog.delete_product(product_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_product_movements(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id: ProductId = match errors::parse_id(&id, "product") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let product = match services.catalog.get_product(product_id).await {
        Ok(p) => p,
        Err(e) => return errors::service_error_to_response(e),
    };
    match services
        .catalog
        .list_movements(&MovementFilter::for_product(product_id))
        .await
    {
        Ok(movements) => {
            let items = movements
                .iter()
                .map(|m| dto::movement_to_json(m, Some(product.name())))
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

pub async fn get_total(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id: ProductId = match errors::parse_id(&id, "product") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.catalog.warehouse_total(product_id).await {
        Ok(stock) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "product_id": product_id.to_string(),
                "warehouse_total": dto::stock_to_json(stock),
            })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
