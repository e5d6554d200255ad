use axum::Router;

pub mod movements;
pub mod products;
pub mod system;

/// Router for the catalog admin endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/products", products::router())
        .nest("/movements", movements::router())
}
