use rocket::{FromForm, UriDisplayQuery};
use serde::{Deserialize, Serialize};

/// Pagination query parameters, e.g. `?page_num=2&page_size=10`.
/// Both have defaults, so a bare URI is always valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromForm, UriDisplayQuery)]
pub struct PaginationRequest {
    #[field(default = 1)]
    pub page_num: u32,
    #[field(default = 50)]
    pub page_size: u32,
}

impl PaginationRequest {
    /// Number of rows before this page. Page numbers and sizes are `u32`,
    /// so the product always fits in a `u64`.
    pub fn skip(&self) -> u64 {
        u64::from(self.page_num.saturating_sub(1)) * u64::from(self.page_size)
    }

    /// Maximum number of rows on this page.
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Wrap one page of items together with the total row count.
    pub fn to_paginated<T>(self, total: u64, items: Vec<T>) -> Paginated<T> {
        Paginated {
            items,
            pagination: PaginationMetadata {
                page_num: self.page_num,
                page_size: self.page_size,
                total,
            },
        }
    }
}

/// One page of results plus pagination metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pagination: PaginationMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMetadata {
    pub page_num: u32,
    pub page_size: u32,
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_counts_previous_pages() {
        let pagination = PaginationRequest {
            page_num: 3,
            page_size: 10,
        };
        assert_eq!(pagination.skip(), 20);

        // Page zero is treated like page one.
        let zeroth = PaginationRequest {
            page_num: 0,
            page_size: 10,
        };
        assert_eq!(zeroth.skip(), 0);
    }

    #[test]
    fn skip_survives_huge_pages() {
        // 69_999 * 70_000 does not fit in a u32.
        let pagination = PaginationRequest {
            page_num: 70_000,
            page_size: 70_000,
        };
        assert_eq!(pagination.skip(), 4_899_930_000);
    }

    #[test]
    fn wraps_items_with_metadata() {
        let pagination = PaginationRequest {
            page_num: 2,
            page_size: 2,
        };
        let paginated = pagination.to_paginated(5, vec!["a", "b"]);
        assert_eq!(paginated.items, ["a", "b"]);
        assert_eq!(paginated.pagination.page_num, 2);
        assert_eq!(paginated.pagination.page_size, 2);
        assert_eq!(paginated.pagination.total, 5);
    }
}
