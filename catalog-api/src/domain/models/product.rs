use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 已持久化的商品，`id` 由存储层分配
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 尚未写入存储的商品
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductDraft {
    pub fn new(slug: String, input: NewProduct) -> Self {
        let now = Utc::now();
        Self {
            slug,
            name: input.name,
            description: input.description,
            price: input.price,
            quantity: input.quantity,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn into_product(self, id: i64) -> Product {
        Product {
            id,
            slug: self.slug,
            name: self.name,
            description: self.description,
            price: self.price,
            quantity: self.quantity,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// 创建商品的输入，已通过校验
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub quantity: i32,
}

/// 部分更新，`None` 表示保留原值
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub quantity: Option<i32>,
}
