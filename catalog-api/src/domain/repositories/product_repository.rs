use async_trait::async_trait;

use crate::domain::models::product::{Product, ProductDraft};
use crate::error::AppError;
use crate::utils::pagination::{Page, PageRequest};

/// 商品存储
///
/// `insert` 在 slug 已存在时必须返回 `AppError::Conflict`，
/// slug 去重的最终保证依赖这一点。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn exists_by_slug(&self, slug: &str) -> Result<bool, AppError>;
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Product>, AppError>;
    async fn find_page(&self, request: &PageRequest) -> Result<Page<Product>, AppError>;
    async fn insert(&self, draft: ProductDraft) -> Result<Product, AppError>;
    async fn update(&self, product: &Product) -> Result<Product, AppError>;
    async fn delete_by_id(&self, id: i64) -> Result<(), AppError>;
}
