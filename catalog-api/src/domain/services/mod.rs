pub mod product_service;
pub mod slug;
