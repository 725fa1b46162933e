//! 商品目录服务: 商品的增删改查、slug 生成，以及基于 LLM 的商品描述生成

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod logging;
pub mod server;
pub mod utils;
