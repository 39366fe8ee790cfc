//! This modules defines the common functionality for paging data.

use serde::Serialize;

/// The config for pagination
#[derive(Debug, Clone)]
pub struct PaginationConfig {
    /// The page number to default to when not specified in a request.
    pub default_page: u64,
    /// The number of records per page when not specified in a request.
    pub default_page_size: u64,
    /// The largest page size a client may ask for.
    pub max_page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page: 1,
            default_page_size: 10,
            max_page_size: 100,
        }
    }
}

/// The paging details sent alongside a page of records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    /// The 1-based page number.
    pub page: u64,
    /// The maximum number of records per page.
    pub limit: u64,
    /// The number of records matching the query across all pages.
    pub total: u64,
    /// The number of pages needed to show `total` records.
    pub pages: u64,
}

impl Pagination {
    /// Create the paging details for `page` of a result set of size `total`.
    ///
    /// `limit` must be greater than zero.
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        Self {
            page,
            limit,
            total,
            pages: total.div_ceil(limit.max(1)),
        }
    }

    /// The number of records to skip to reach `page`, or `None` if the
    /// offset does not fit in the integer type SQLite expects.
    pub fn offset(page: u64, limit: u64) -> Option<i64> {
        page.checked_sub(1)
            .and_then(|pages_skipped| pages_skipped.checked_mul(limit))
            .and_then(|offset| i64::try_from(offset).ok())
    }
}

#[cfg(test)]
mod tests {
    use crate::pagination::Pagination;

    #[test]
    fn counts_partial_last_page() {
        let pagination = Pagination::new(1, 10, 15);

        assert_eq!(pagination.pages, 2);
    }

    #[test]
    fn no_records_means_no_pages() {
        assert_eq!(Pagination::new(1, 10, 0).pages, 0);
    }

    #[test]
    fn offset_skips_previous_pages() {
        assert_eq!(Pagination::offset(1, 10), Some(0));
        assert_eq!(Pagination::offset(3, 10), Some(20));
        assert_eq!(Pagination::offset(u64::MAX, 100), None);
    }
}
