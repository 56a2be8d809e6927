//! Catalog query engine: filter, sort and paginate product listings.
//!
//! Everything here is a pure function of the product collection and the
//! query. The boundary layer feeds raw query-string values in through
//! [`RawListQuery`] and gets back a [`Page`] carrying enough navigation state
//! to build prev/next links without re-deriving the filter.

use core::cmp::Ordering;

use serde::{Deserialize, Serialize};

use storefront_core::{AggregateRoot, DomainError, DomainResult};

use crate::product::Product;

pub const DEFAULT_LIMIT: u32 = 10;
pub const DEFAULT_PAGE: u32 = 1;

/// Price ordering.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// Unknown or missing values fall back to ascending.
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("desc") => Self::Desc,
            _ => Self::Asc,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    fn compare_prices(self, a: f64, b: f64) -> Ordering {
        match self {
            Self::Asc => a.total_cmp(&b),
            Self::Desc => b.total_cmp(&a),
        }
    }
}

/// Listing predicate. `None` fields do not constrain the result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    /// Case-insensitive substring of title OR description.
    pub text: Option<String>,
    /// Exact category match.
    pub category: Option<String>,
    /// Availability flag.
    pub status: Option<bool>,
}

impl ProductFilter {
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.category.is_none() && self.status.is_none()
    }

    pub fn matches(&self, product: &Product) -> bool {
        Matcher::new(self).matches(product)
    }
}

/// Filter with the text needle lowered once per query.
struct Matcher<'a> {
    filter: &'a ProductFilter,
    needle: Option<String>,
}

impl<'a> Matcher<'a> {
    fn new(filter: &'a ProductFilter) -> Self {
        Self {
            filter,
            needle: filter.text.as_ref().map(|t| t.to_lowercase()),
        }
    }

    fn matches(&self, product: &Product) -> bool {
        if let Some(category) = &self.filter.category {
            if product.category() != category {
                return false;
            }
        }
        if let Some(status) = self.filter.status {
            if product.status() != status {
                return false;
            }
        }
        match &self.needle {
            Some(needle) => {
                product.title().to_lowercase().contains(needle)
                    || product.description().to_lowercase().contains(needle)
            }
            None => true,
        }
    }
}

/// Query-string shaped listing options, exactly as received.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawListQuery {
    pub limit: Option<String>,
    pub page: Option<String>,
    pub sort: Option<String>,
    pub query: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
}

/// Validated listing options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    limit: u32,
    page: u32,
    sort: SortOrder,
    filter: ProductFilter,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            page: DEFAULT_PAGE,
            sort: SortOrder::Asc,
            filter: ProductFilter::default(),
        }
    }
}

impl ListQuery {
    /// Strict constructor: `limit` and `page` must both be positive.
    pub fn new(limit: u32, page: u32, sort: SortOrder, filter: ProductFilter) -> DomainResult<Self> {
        if limit == 0 {
            return Err(DomainError::validation("limit must be a positive integer"));
        }
        if page == 0 {
            return Err(DomainError::validation("page must be a positive integer"));
        }
        Ok(Self {
            limit,
            page,
            sort,
            filter,
        })
    }

    /// Lenient coercion from raw query-string values.
    ///
    /// Non-numeric or non-positive `limit`/`page` fall back to their defaults,
    /// unknown `sort` falls back to ascending, and empty strings mean "no
    /// filter". A non-empty `status` other than `"true"` selects unavailable
    /// products.
    pub fn from_raw(raw: &RawListQuery) -> Self {
        Self {
            limit: coerce_positive(raw.limit.as_deref(), DEFAULT_LIMIT),
            page: coerce_positive(raw.page.as_deref(), DEFAULT_PAGE),
            sort: SortOrder::parse_lenient(raw.sort.as_deref()),
            filter: ProductFilter {
                text: non_empty(raw.query.as_deref()),
                category: non_empty(raw.category.as_deref()),
                status: non_empty(raw.status.as_deref()).map(|s| s == "true"),
            },
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn sort(&self) -> SortOrder {
        self.sort
    }

    pub fn filter(&self) -> &ProductFilter {
        &self.filter
    }

    /// Same query pointed at another page.
    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page: page.max(1),
            ..self.clone()
        }
    }

    /// Key/value pairs reproducing this query for `page`, in a stable order.
    /// Absent filters render as empty values.
    pub fn query_pairs(&self, page: u32) -> Vec<(&'static str, String)> {
        vec![
            ("limit", self.limit.to_string()),
            ("page", page.to_string()),
            ("sort", self.sort.as_str().to_string()),
            ("query", self.filter.text.clone().unwrap_or_default()),
            ("category", self.filter.category.clone().unwrap_or_default()),
            (
                "status",
                self.filter.status.map(|s| s.to_string()).unwrap_or_default(),
            ),
        ]
    }
}

fn coerce_positive(raw: Option<&str>, default: u32) -> u32 {
    raw.and_then(|s| s.trim().parse::<u32>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(default)
}

fn non_empty(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// One page of a listing plus navigation metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_items: usize,
    pub total_pages: u32,
    pub page: u32,
    pub limit: u32,
    pub prev_page: Option<u32>,
    pub next_page: Option<u32>,
    pub has_prev_page: bool,
    pub has_next_page: bool,
}

/// Filter, sort by price (ties broken by ascending id) and slice one page.
pub fn list<I>(products: I, query: &ListQuery) -> Page<Product>
where
    I: IntoIterator<Item = Product>,
{
    let matcher = Matcher::new(&query.filter);
    let mut matched: Vec<Product> = products.into_iter().filter(|p| matcher.matches(p)).collect();

    matched.sort_by(|a, b| {
        query
            .sort
            .compare_prices(a.price(), b.price())
            .then_with(|| a.id().cmp(b.id()))
    });

    let total_items = matched.len();
    let limit = query.limit as usize;
    let total_pages = u32::try_from(total_items.div_ceil(limit)).unwrap_or(u32::MAX);
    let start = (query.page as usize - 1).saturating_mul(limit);

    let items = matched.into_iter().skip(start).take(limit).collect();

    let has_prev_page = query.page > 1;
    let has_next_page = query.page < total_pages;

    Page {
        items,
        total_items,
        total_pages,
        page: query.page,
        limit: query.limit,
        prev_page: has_prev_page.then(|| query.page - 1),
        next_page: has_next_page.then(|| query.page + 1),
        has_prev_page,
        has_next_page,
    }
}
