//! Page/offset pagination helpers.

use serde::{Deserialize, Serialize};

/// Default number of results per page.
pub const DEFAULT_PER_PAGE: i64 = 25;
/// Maximum number of results per page.
pub const MAX_PER_PAGE: i64 = 100;
/// Minimum number of results per page.
pub const MIN_PER_PAGE: i64 = 1;

/// Query parameters for page/offset pagination.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    /// 1-based page number.
    pub page: Option<i64>,

    /// Number of results per page (1-100, default 25).
    pub per_page: Option<i64>,
}

impl PageQuery {
    /// Returns the effective page number (minimum 1).
    pub fn effective_page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    /// Returns the effective page size, clamped to valid range.
    pub fn effective_per_page(&self) -> i64 {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(MIN_PER_PAGE, MAX_PER_PAGE)
    }

    /// Returns the row offset for the effective page.
    pub fn offset(&self) -> i64 {
        (self.effective_page() - 1) * self.effective_per_page()
    }
}

/// Pagination metadata returned alongside paged results.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl PageInfo {
    /// Builds page metadata from the effective query and a total row count.
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            (total + per_page - 1) / per_page
        };
        Self {
            page,
            per_page,
            total,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(page: Option<i64>, per_page: Option<i64>) -> PageQuery {
        PageQuery { page, per_page }
    }

    #[test]
    fn test_effective_page_defaults_to_first() {
        assert_eq!(query(None, None).effective_page(), 1);
        assert_eq!(query(Some(0), None).effective_page(), 1);
        assert_eq!(query(Some(-3), None).effective_page(), 1);
        assert_eq!(query(Some(7), None).effective_page(), 7);
    }

    #[test]
    fn test_effective_per_page_clamped() {
        assert_eq!(query(None, None).effective_per_page(), DEFAULT_PER_PAGE);
        assert_eq!(query(None, Some(0)).effective_per_page(), MIN_PER_PAGE);
        assert_eq!(query(None, Some(500)).effective_per_page(), MAX_PER_PAGE);
        assert_eq!(query(None, Some(42)).effective_per_page(), 42);
    }

    #[test]
    fn test_offset() {
        assert_eq!(query(Some(1), Some(25)).offset(), 0);
        assert_eq!(query(Some(3), Some(25)).offset(), 50);
        assert_eq!(query(Some(2), Some(100)).offset(), 100);
    }

    #[test]
    fn test_page_info_total_pages() {
        assert_eq!(PageInfo::new(1, 25, 0).total_pages, 0);
        assert_eq!(PageInfo::new(1, 25, 1).total_pages, 1);
        assert_eq!(PageInfo::new(1, 25, 25).total_pages, 1);
        assert_eq!(PageInfo::new(1, 25, 26).total_pages, 2);
        assert_eq!(PageInfo::new(2, 10, 95).total_pages, 10);
    }

    #[test]
    fn test_page_query_deserializes_camel_case() {
        let q: PageQuery = serde_json::from_str(r#"{"page": 2, "perPage": 50}"#).unwrap();
        assert_eq!(q.effective_page(), 2);
        assert_eq!(q.effective_per_page(), 50);
    }
}
