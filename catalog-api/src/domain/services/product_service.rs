use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::domain::models::product::{NewProduct, Product, ProductDraft, ProductPatch};
use crate::domain::repositories::product_repository::ProductRepository;
use crate::domain::services::slug::{resolve_unique, slugify};
use crate::error::AppError;
use crate::utils::pagination::{Page, PageRequest};

/// 插入时 slug 冲突的最大尝试次数
const MAX_SLUG_ATTEMPTS: usize = 3;

pub struct ProductService {
    repository: Arc<dyn ProductRepository>,
}

impl ProductService {
    pub fn new(repository: Arc<dyn ProductRepository>) -> Self {
        Self { repository }
    }

    pub async fn list_products(&self, request: PageRequest) -> Result<Page<Product>, AppError> {
        self.repository.find_page(&request).await
    }

    pub async fn get_product(&self, slug: &str) -> Result<Product, AppError> {
        self.repository
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product with slug {} not found", slug)))
    }

    pub async fn generate_unique_slug(&self, base_slug: &str) -> Result<String, AppError> {
        let repository = &self.repository;
        resolve_unique(base_slug, |candidate| async move {
            repository.exists_by_slug(&candidate).await
        })
        .await
    }

    /// 探测空闲 slug 后插入；并发写入抢占同一 slug 时由唯一索引拒绝，重新探测
    pub async fn create_product(&self, input: NewProduct) -> Result<Product, AppError> {
        let base_slug = slugify(&input.name);
        let mut attempt = 1;

        loop {
            let slug = self.generate_unique_slug(&base_slug).await?;
            let draft = ProductDraft::new(slug, input.clone());

            match self.repository.insert(draft).await {
                Ok(product) => {
                    tracing::info!(id = product.id, slug = %product.slug, "product created");
                    return Ok(product);
                }
                Err(AppError::Conflict(reason)) if attempt < MAX_SLUG_ATTEMPTS => {
                    tracing::warn!(attempt, %reason, "slug taken by a concurrent insert, retrying");
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    pub async fn update_product(&self, slug: &str, patch: ProductPatch) -> Result<Product, AppError> {
        // 检查产品是否存在
        let existing = self.get_product(slug).await?;

        let merged = merge(&existing, patch);
        let product = self.repository.update(&merged).await?;

        tracing::info!(id = product.id, slug = %product.slug, "product updated");
        Ok(product)
    }

    /// 删除并返回被删除的商品
    pub async fn delete_product(&self, slug: &str) -> Result<Product, AppError> {
        let product = self.get_product(slug).await?;

        self.repository.delete_by_id(product.id).await?;

        tracing::info!(id = product.id, slug = %product.slug, "product deleted");
        Ok(product)
    }
}

/// 合并部分更新
///
/// 字符串字段为空串时视为未提供。`id`、`slug`、`created_at` 始终沿用原值，
/// `updated_at` 严格晚于原值。
pub fn merge(existing: &Product, patch: ProductPatch) -> Product {
    Product {
        id: existing.id,
        slug: existing.slug.clone(),
        name: non_empty(patch.name).unwrap_or_else(|| existing.name.clone()),
        description: non_empty(patch.description).or_else(|| existing.description.clone()),
        price: patch.price.unwrap_or(existing.price),
        quantity: patch.quantity.unwrap_or(existing.quantity),
        created_at: existing.created_at,
        updated_at: next_timestamp(existing.updated_at),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}
