//! Pagination parameters and results shared by list endpoints

use serde::Serialize;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Normalized page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub page_size: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ListParams {
    /// Normalize raw query values.
    ///
    /// A missing, unparsable or non-positive page falls back to `default_page`;
    /// pages past `u32::MAX` are clamped to it.
    /// A page size outside `[1, max_page_size]` falls back to `default_page_size`.
    pub fn normalize(
        raw_page: Option<&str>,
        raw_page_size: Option<&str>,
        default_page: u32,
        default_page_size: u32,
        max_page_size: u32,
    ) -> Self {
        let page = raw_page
            .and_then(|p| p.trim().parse::<i64>().ok())
            .filter(|p| *p >= 1)
            .map(|p| u32::try_from(p).unwrap_or(u32::MAX))
            .unwrap_or(default_page);

        let page_size = raw_page_size
            .and_then(|s| s.trim().parse::<i64>().ok())
            .filter(|s| *s >= 1 && *s <= i64::from(max_page_size))
            .and_then(|s| u32::try_from(s).ok())
            .unwrap_or(default_page_size);

        Self { page, page_size }
    }

    /// Normalize with the defaults used by every public list (1, 10, max 100)
    pub fn from_query(raw_page: Option<&str>, raw_page_size: Option<&str>) -> Self {
        Self::normalize(raw_page, raw_page_size, DEFAULT_PAGE, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE)
    }

    /// Calculate the offset for database queries
    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.page_size)
    }

    /// Get the limit for database queries
    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }
}

/// `ceil(total / page_size)` in integer arithmetic; zero items is zero pages
pub fn total_pages(total: i64, page_size: u32) -> i64 {
    if page_size == 0 || total <= 0 {
        return 0;
    }
    let size = i64::from(page_size);
    let pages = total / size;
    if total % size > 0 {
        pages + 1
    } else {
        pages
    }
}

/// Paginated result container
#[derive(Debug, Clone, Serialize)]
pub struct PagedResult<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    /// Current page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub page_size: u32,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            page_size: params.page_size,
        }
    }

    pub fn total_pages(&self) -> i64 {
        total_pages(self.total, self.page_size)
    }

    /// Convert the items, keeping the page metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_out_of_range_falls_back() {
        let params = ListParams::normalize(Some("0"), Some("500"), 1, 10, 100);
        assert_eq!(params, ListParams { page: 1, page_size: 10 });
    }

    #[test]
    fn test_normalize_keeps_valid_values() {
        let params = ListParams::normalize(Some("3"), Some("25"), 1, 10, 100);
        assert_eq!(params, ListParams { page: 3, page_size: 25 });

        let at_max = ListParams::normalize(Some("1"), Some("100"), 1, 10, 100);
        assert_eq!(at_max.page_size, 100);
    }

    #[test]
    fn test_normalize_unparsable_and_missing() {
        assert_eq!(
            ListParams::normalize(Some("abc"), Some("1.5"), 1, 10, 100),
            ListParams { page: 1, page_size: 10 }
        );
        assert_eq!(
            ListParams::normalize(None, None, 2, 20, 100),
            ListParams { page: 2, page_size: 20 }
        );
        assert_eq!(
            ListParams::normalize(Some("-4"), Some("-1"), 1, 10, 100),
            ListParams { page: 1, page_size: 10 }
        );
    }

    #[test]
    fn test_huge_page_is_clamped_not_reset() {
        let params = ListParams::normalize(Some("5000000000"), Some("10"), 1, 10, 100);
        assert_eq!(params.page, u32::MAX);
        assert_eq!(params.offset(), (i64::from(u32::MAX) - 1) * 10);
    }

    #[test]
    fn test_offset_and_limit() {
        let params = ListParams { page: 3, page_size: 10 };
        assert_eq!(params.offset(), 20);
        assert_eq!(params.limit(), 10);
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(25, 10), 3);
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(1, 100), 1);
    }

    #[test]
    fn test_paged_result_map_keeps_metadata() {
        let params = ListParams { page: 2, page_size: 2 };
        let paged = PagedResult::new(vec![1, 2], 5, &params).map(|n| n * 10);

        assert_eq!(paged.items, vec![10, 20]);
        assert_eq!(paged.total, 5);
        assert_eq!(paged.page, 2);
        assert_eq!(paged.total_pages(), 3);
    }
}
