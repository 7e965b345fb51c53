use serde::{Deserialize, Serialize};

use crate::domain::{Page, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Paging query parameters, defaulting to the first page of ten items
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl PageQuery {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1)
    }

    /// Requested page size, with non-positive sizes replaced by the default and large sizes capped
    pub fn page_size(&self) -> i64 {
        match self.page_size {
            Some(size) if size > 0 => size.min(MAX_PAGE_SIZE),
            _ => DEFAULT_PAGE_SIZE,
        }
    }
}

/// Paging fields shared by every listing response
#[derive(Debug, Serialize)]
pub struct PageInfo {
    pub page: i64,
    pub page_size: i64,
    pub total_items: i64,
    pub total_pages: i64,
}

impl<T> From<&Page<T>> for PageInfo {
    fn from(page: &Page<T>) -> Self {
        Self {
            page: page.page,
            page_size: page.page_size,
            total_items: page.total_count,
            total_pages: page.total_pages(),
        }
    }
}
