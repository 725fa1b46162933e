use axum::{
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
};

use crate::api::products;
use crate::domain::repositories::product_repository::ProductRepository;
use crate::error::AppError;
use crate::infrastructure::llm::CompletionClient;

#[derive(Clone)]
pub struct AppState {
    pub products: Arc<dyn ProductRepository>,
    pub llm: CompletionClient,
}

pub async fn create_app(state: AppState) -> Result<Router, AppError> {
    let app_state = Arc::new(state);

    // 健康检查路由
    let health_route = Router::new()
        .route("/health", get(|| async { "OK" }));

    // 组合所有路由
    let app = Router::new()
        .nest("/products", products::routes())
        .merge(health_route)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(app_state);

    Ok(app)
}
