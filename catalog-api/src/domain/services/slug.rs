//! 商品 slug 的生成与去重
//!
//! `slugify` 是纯函数；`resolve_unique` 只负责按 `-1`、`-2` ... 的顺序探测，
//! 不持有任何锁。真正的唯一性由 `products.slug` 上的唯一索引保证，
//! 冲突后的重试见 `ProductService::create_product`。

use std::future::Future;

use once_cell::sync::Lazy;
use regex::Regex;

static NON_SLUG_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new("[^a-z0-9]+").expect("valid slug pattern"));

/// 去除首尾空白、转小写，并把每段连续的非 `[a-z0-9]` 字符替换为单个 `-`
pub fn slugify(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    NON_SLUG_CHARS.replace_all(&lowered, "-").into_owned()
}

/// 返回第一个 `exists` 判定为空闲的候选值
///
/// 候选顺序为 `base`、`base-1`、`base-2` ...，没有迭代上限。
/// `exists` 的错误原样向上传播。
pub async fn resolve_unique<F, Fut, E>(base: &str, mut exists: F) -> Result<String, E>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    let mut candidate = base.to_string();
    let mut counter: u64 = 1;

    while exists(candidate.clone()).await? {
        candidate = format!("{}-{}", base, counter);
        counter += 1;
    }

    Ok(candidate)
}
