use async_trait::async_trait;
use sqlx::mysql::MySqlPoolOptions;
use sqlx::{MySql, MySqlPool, QueryBuilder};

use crate::config::Config;
use crate::domain::models::product::{Product, ProductDraft};
use crate::domain::repositories::product_repository::ProductRepository;
use crate::error::AppError;
use crate::utils::pagination::{Page, PageRequest};

pub async fn init_mysql(config: &Config) -> Result<MySqlPool, AppError> {
    tracing::info!("Initializing MySQL connection pool");

    let pool = MySqlPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await?;

    // 运行迁移
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await?;

    Ok(pool)
}

const PRODUCT_COLUMNS: &str =
    "id, slug, name, description, price, quantity, created_at, updated_at";

pub struct MySqlProductRepository {
    pool: MySqlPool,
}

impl MySqlProductRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// 搜索条件: name 或 description 包含关键字，忽略大小写
    fn push_search(builder: &mut QueryBuilder<'_, MySql>, search: Option<&str>) {
        if let Some(term) = search {
            let pattern = format!("%{}%", escape_like(&term.to_lowercase()));
            builder
                .push(" WHERE LOWER(name) LIKE ")
                .push_bind(pattern.clone())
                .push(" OR LOWER(description) LIKE ")
                .push_bind(pattern);
        }
    }
}

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[async_trait]
impl ProductRepository for MySqlProductRepository {
    async fn exists_by_slug(&self, slug: &str) -> Result<bool, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE slug = ?")
            .bind(slug)
            .fetch_one(&self.pool)
            .await?;

        Ok(count > 0)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Product>, AppError> {
        let sql = format!("SELECT {} FROM products WHERE slug = ?", PRODUCT_COLUMNS);
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    async fn find_page(&self, request: &PageRequest) -> Result<Page<Product>, AppError> {
        if request.page < 0 {
            return Err(AppError::BadRequest("Page index must not be less than zero".to_string()));
        }
        if request.page_size < 1 {
            return Err(AppError::BadRequest("Page size must not be less than one".to_string()));
        }

        let search = request.search.as_deref();

        // 获取总记录数
        let mut count_query = QueryBuilder::<MySql>::new("SELECT COUNT(*) FROM products");
        Self::push_search(&mut count_query, search);
        let total: i64 = count_query
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        // 获取分页数据，排序列来自白名单
        let mut page_query = QueryBuilder::<MySql>::new(format!("SELECT {} FROM products", PRODUCT_COLUMNS));
        Self::push_search(&mut page_query, search);
        page_query
            .push(format!(
                " ORDER BY {} {dir}, id {dir}",
                request.sort.field.column(),
                dir = request.sort.direction.as_sql()
            ))
            .push(" LIMIT ")
            .push_bind(request.page_size)
            .push(" OFFSET ")
            .push_bind(request.offset());

        let products = page_query
            .build_query_as::<Product>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page {
            items: products,
            total: total.max(0) as u64,
            page: request.page,
            page_size: request.page_size,
        })
    }

    async fn insert(&self, draft: ProductDraft) -> Result<Product, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO products (slug, name, description, price, quantity, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
            .bind(&draft.slug)
            .bind(&draft.name)
            .bind(&draft.description)
            .bind(draft.price)
            .bind(draft.quantity)
            .bind(draft.created_at)
            .bind(draft.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|err| match err {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    AppError::Conflict(format!("Product with slug {} already exists", draft.slug))
                }
                other => AppError::Database(other),
            })?;

        Ok(draft.into_product(result.last_insert_id() as i64))
    }

    async fn update(&self, product: &Product) -> Result<Product, AppError> {
        sqlx::query(
            r#"
            UPDATE products
            SET name = ?, description = ?, price = ?, quantity = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
            .bind(&product.name)
            .bind(&product.description)
            .bind(product.price)
            .bind(product.quantity)
            .bind(product.updated_at)
            .bind(product.id)
            .execute(&self.pool)
            .await?;

        Ok(product.clone())
    }

    async fn delete_by_id(&self, id: i64) -> Result<(), AppError> {
        sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
