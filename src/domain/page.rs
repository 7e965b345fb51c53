use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// A validated request for one page of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: i64,
    page_size: i64,
}

impl PageRequest {
    pub fn new(page: i64, page_size: i64) -> Result<Self, String> {
        if page < 1 {
            return Err(format!("Page must be at least 1 (got {})", page));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(format!(
                "Page size must be between 1 and {} (got {})",
                MAX_PAGE_SIZE, page_size
            ));
        }
        Ok(Self { page, page_size })
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn page_size(&self) -> i64 {
        self.page_size
    }

    /// Number of rows to fetch
    pub fn limit(&self) -> i64 {
        self.page_size
    }

    /// Number of rows to skip
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of a listing together with the size of the whole result set
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub page_size: i64,
    pub total_count: i64,
}

impl<T> Page<T> {
    pub fn new(request: PageRequest, items: Vec<T>, total_count: i64) -> Self {
        Self {
            items,
            page: request.page(),
            page_size: request.page_size(),
            total_count,
        }
    }

    pub fn total_pages(&self) -> i64 {
        total_pages(self.total_count, self.page_size)
    }
}

/// A page of priced rows, with the price summed over every matching row
#[derive(Debug, Clone, Serialize)]
pub struct PricedPage<T> {
    pub page: Page<T>,
    pub total_price: i64,
}

pub fn total_pages(total_count: i64, page_size: i64) -> i64 {
    if page_size <= 0 || total_count <= 0 {
        return 0;
    }
    (total_count + page_size - 1) / page_size
}
