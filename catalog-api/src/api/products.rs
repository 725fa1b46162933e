use axum::{
    routing::{get, post},
    Router,
    Json,
    extract::{State, Path, Query},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};
use std::sync::Arc;

use crate::domain::models::product::{NewProduct, Product, ProductPatch};
use crate::domain::services::product_service::ProductService;
use crate::error::AppError;
use crate::server::AppState;
use crate::utils::pagination::{PageRequest, Paginated, PaginationParams};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/generate-description", post(generate_description))
        .route("/{slug}", get(get_product).put(update_product).delete(delete_product))
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: f64,
    pub quantity: i32,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            name: product.name,
            slug: product.slug,
            description: product.description,
            price: product.price,
            quantity: product.quantity,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(required(message = "Name is required"), custom(function = "not_blank"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(required(message = "Price is required"), range(exclusive_min = 0.0, message = "Price must be a positive value"))]
    pub price: Option<f64>,
    #[validate(required(message = "Quantity is required"), range(min = 0, message = "Quantity must be a positive value"))]
    pub quantity: Option<i32>,
}

impl CreateProductRequest {
    /// 仅在 `validate()` 通过后调用
    fn into_new_product(self) -> Result<NewProduct, AppError> {
        match (self.name, self.price, self.quantity) {
            (Some(name), Some(price), Some(quantity)) => Ok(NewProduct {
                name,
                description: self.description,
                price,
                quantity,
            }),
            _ => Err(AppError::Validation("name, price and quantity are required".to_string())),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProductRequest {
    #[validate(custom(function = "not_whitespace"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(range(exclusive_min = 0.0, message = "Price must be a positive value"))]
    pub price: Option<f64>,
    #[validate(range(min = 0, message = "Quantity must be a positive value"))]
    pub quantity: Option<i32>,
}

impl From<UpdateProductRequest> for ProductPatch {
    fn from(request: UpdateProductRequest) -> Self {
        Self {
            name: request.name,
            description: request.description,
            price: request.price,
            quantity: request.quantity,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DescriptionRequest {
    pub name: Option<String>,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("Name is required".into()));
    }
    Ok(())
}

/// 更新时空串表示不修改，只拒绝纯空白
fn not_whitespace(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Ok(());
    }
    not_blank(value)
}

async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Paginated<ProductResponse>>, AppError> {
    let product_service = ProductService::new(state.products.clone());

    let page = product_service.list_products(PageRequest::from(params)).await?;

    Ok(Json(Paginated::from(page.map(ProductResponse::from))))
}

async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<ProductResponse>, AppError> {
    let product_service = ProductService::new(state.products.clone());

    let product = product_service.get_product(&slug).await?;

    Ok(Json(ProductResponse::from(product)))
}

async fn create_product(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), AppError> {
    // 验证请求
    payload.validate().map_err(|e| AppError::Validation(e.to_string()))?;

    let product_service = ProductService::new(state.products.clone());

    let product = product_service.create_product(payload.into_new_product()?).await?;

    Ok((StatusCode::CREATED, Json(ProductResponse::from(product))))
}

async fn update_product(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<Json<ProductResponse>, AppError> {
    // 验证请求
    payload.validate().map_err(|e| AppError::Validation(e.to_string()))?;

    let product_service = ProductService::new(state.products.clone());

    let product = product_service.update_product(&slug, payload.into()).await?;

    Ok(Json(ProductResponse::from(product)))
}

async fn delete_product(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<String, AppError> {
    let product_service = ProductService::new(state.products.clone());

    let product = product_service.delete_product(&slug).await?;

    Ok(format!("Deleted {} successfully!", product.name))
}

async fn generate_description(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<DescriptionRequest>,
) -> Result<String, AppError> {
    let name = payload
        .name
        .filter(|name| !name.is_empty())
        .ok_or_else(|| {
            AppError::BadRequest(
                "Product name is missing, please enter product name before generating description".to_string(),
            )
        })?;

    // 失败时返回的也是文本，直接透传
    Ok(state.llm.generate_description(&name).await)
}
