use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use axum::Router;
use tokio::sync::RwLock;

use catalog_api::config::{Config, DatabaseConfig, LlmConfig, LoggingConfig, ServerConfig};
use catalog_api::domain::models::product::{Product, ProductDraft};
use catalog_api::domain::repositories::product_repository::ProductRepository;
use catalog_api::error::AppError;
use catalog_api::infrastructure::llm::CompletionClient;
use catalog_api::server::{create_app, AppState};
use catalog_api::utils::pagination::{Page, PageRequest, SortDirection, SortField};

/// 内存版商品存储，slug 唯一约束与 MySQL 实现一致
#[derive(Default)]
pub struct MemoryProductRepository {
    products: RwLock<Vec<Product>>,
    next_id: AtomicI64,
}

impl MemoryProductRepository {
    pub async fn len(&self) -> usize {
        self.products.read().await.len()
    }
}

#[async_trait]
impl ProductRepository for MemoryProductRepository {
    async fn exists_by_slug(&self, slug: &str) -> Result<bool, AppError> {
        Ok(self.products.read().await.iter().any(|p| p.slug == slug))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Product>, AppError> {
        Ok(self.products.read().await.iter().find(|p| p.slug == slug).cloned())
    }

    async fn find_page(&self, request: &PageRequest) -> Result<Page<Product>, AppError> {
        if request.page < 0 || request.page_size < 1 {
            return Err(AppError::BadRequest("invalid page".to_string()));
        }

        let term = request.search.as_deref().map(str::to_lowercase);
        let mut matched: Vec<Product> = self
            .products
            .read()
            .await
            .iter()
            .filter(|p| match &term {
                Some(term) => {
                    p.name.to_lowercase().contains(term)
                        || p.description.as_deref().is_some_and(|d| d.to_lowercase().contains(term))
                }
                None => true,
            })
            .cloned()
            .collect();

        matched.sort_by(|a, b| {
            let ordering = match request.sort.field {
                SortField::Name => a.name.cmp(&b.name),
                SortField::Price => a.price.total_cmp(&b.price),
                SortField::Quantity => a.quantity.cmp(&b.quantity),
                SortField::CreatedAt => a.created_at.cmp(&b.created_at),
                SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            }
            .then_with(|| a.id.cmp(&b.id));
            match request.sort.direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        });

        let total = matched.len() as u64;
        let items = matched
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.page_size as usize)
            .collect();

        Ok(Page {
            items,
            total,
            page: request.page,
            page_size: request.page_size,
        })
    }

    async fn insert(&self, draft: ProductDraft) -> Result<Product, AppError> {
        let mut products = self.products.write().await;
        if products.iter().any(|p| p.slug == draft.slug) {
            return Err(AppError::Conflict(draft.slug));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let product = draft.into_product(id);
        products.push(product.clone());
        Ok(product)
    }

    async fn update(&self, product: &Product) -> Result<Product, AppError> {
        let mut products = self.products.write().await;
        match products.iter_mut().find(|p| p.id == product.id) {
            Some(existing) => {
                *existing = product.clone();
                Ok(product.clone())
            }
            None => Err(AppError::NotFound(format!("Product with id {} not found", product.id))),
        }
    }

    async fn delete_by_id(&self, id: i64) -> Result<(), AppError> {
        self.products.write().await.retain(|p| p.id != id);
        Ok(())
    }
}

pub fn test_config(llm_base_url: &str) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database: DatabaseConfig {
            url: "mysql://unused".to_string(),
            max_connections: 1,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        llm: LlmConfig {
            base_url: llm_base_url.to_string(),
            api_key: "test-key".to_string(),
        },
    }
}

pub async fn test_app(llm_base_url: &str) -> (Router, Arc<MemoryProductRepository>) {
    let config = test_config(llm_base_url);
    let repository = Arc::new(MemoryProductRepository::default());

    let state = AppState {
        llm: CompletionClient::new(&config.llm),
        products: repository.clone(),
    };

    let app = create_app(state).await.expect("router builds");
    (app, repository)
}
