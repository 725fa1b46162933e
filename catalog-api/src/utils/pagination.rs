use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: i64 = 12;

/// 列表接口的原始查询参数
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationParams {
    #[serde(default)]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
    #[serde(default = "default_sort_by")]
    pub sort_by: String,
    #[serde(default = "default_sort_order")]
    pub sort_order: String,
    #[serde(default)]
    pub search: String,
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

fn default_sort_by() -> String {
    SortField::DEFAULT.as_str().to_string()
}

fn default_sort_order() -> String {
    "desc".to_string()
}

/// 允许排序的字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Name,
    Price,
    Quantity,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    pub const DEFAULT: SortField = SortField::UpdatedAt;

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "name" => Some(SortField::Name),
            "price" => Some(SortField::Price),
            "quantity" => Some(SortField::Quantity),
            "createdAt" => Some(SortField::CreatedAt),
            "updatedAt" => Some(SortField::UpdatedAt),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Name => "name",
            SortField::Price => "price",
            SortField::Quantity => "quantity",
            SortField::CreatedAt => "createdAt",
            SortField::UpdatedAt => "updatedAt",
        }
    }

    /// 对应的数据库列名，只会是白名单中的值
    pub fn column(&self) -> &'static str {
        match self {
            SortField::Name => "name",
            SortField::Price => "price",
            SortField::Quantity => "quantity",
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// 仅忽略大小写的 `asc` 为升序，其余一律降序
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("asc") {
            SortDirection::Ascending
        } else {
            SortDirection::Descending
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

/// 分页 + 排序 + 可选搜索词
///
/// `page`、`page_size` 原样透传，是否合法由存储层判断。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
    pub sort: SortSpec,
    pub search: Option<String>,
}

impl PageRequest {
    pub fn build(page: i64, page_size: i64, sort_by: &str, sort_order: &str) -> Self {
        let field = SortField::parse(sort_by).unwrap_or(SortField::DEFAULT);

        Self {
            page,
            page_size,
            sort: SortSpec {
                field,
                direction: SortDirection::parse(sort_order),
            },
            search: None,
        }
    }

    pub fn with_search(mut self, search: &str) -> Self {
        self.search = if search.is_empty() {
            None
        } else {
            Some(search.to_string())
        };
        self
    }

    pub fn offset(&self) -> i64 {
        self.page.saturating_mul(self.page_size)
    }
}

impl From<PaginationParams> for PageRequest {
    fn from(params: PaginationParams) -> Self {
        PageRequest::build(params.page, params.page_size, &params.sort_by, &params.sort_order)
            .with_search(&params.search)
    }
}

/// 存储层返回的一页数据
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: i64,
    pub page_size: i64,
}

impl<T> Page<T> {
    pub fn page_count(&self) -> u64 {
        if self.page_size <= 0 {
            return 1;
        }
        self.total.div_ceil(self.page_size as u64)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

#[derive(Debug, Serialize)]
pub struct PageMeta {
    pub pagination: PaginationMeta,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub page: i64,
    pub page_size: i64,
    pub page_count: u64,
    pub total: u64,
}

impl<T> From<Page<T>> for Paginated<T> {
    fn from(page: Page<T>) -> Self {
        let pagination = PaginationMeta {
            page: page.page,
            page_size: page.page_size,
            page_count: page.page_count(),
            total: page.total,
        };

        Self {
            data: page.items,
            meta: PageMeta { pagination },
        }
    }
}
