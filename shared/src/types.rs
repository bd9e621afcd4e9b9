//! Common types used across the system

use serde::{Deserialize, Serialize};

/// Pagination parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
        }
    }
}

impl Pagination {
    /// Clamp to sane bounds (page >= 1, 1..=100 items per page)
    pub fn normalized(&self) -> Self {
        Self {
            page: self.page.max(1),
            per_page: self.per_page.clamp(1, 100),
        }
    }

    pub fn offset(&self) -> i64 {
        let p = self.normalized();
        i64::from(p.page - 1) * i64::from(p.per_page)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.normalized().per_page)
    }
}

/// Paginated response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, pagination: &Pagination, total_items: u64) -> Self {
        let p = pagination.normalized();
        let total_pages = (total_items as f64 / f64::from(p.per_page)).ceil() as u32;
        Self {
            data,
            pagination: PaginationMeta {
                page: p.page,
                per_page: p.per_page,
                total_items,
                total_pages,
            },
        }
    }
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_clamps_out_of_range_values() {
        let p = Pagination {
            page: 0,
            per_page: 5000,
        };
        let n = p.normalized();
        assert_eq!(n.page, 1);
        assert_eq!(n.per_page, 100);
    }

    #[test]
    fn offset_accounts_for_page_number() {
        let p = Pagination {
            page: 3,
            per_page: 20,
        };
        assert_eq!(p.offset(), 40);
        assert_eq!(p.limit(), 20);
    }

    #[test]
    fn paginated_response_counts_pages() {
        let resp = PaginatedResponse::new(vec![1, 2, 3], &Pagination::default(), 41);
        assert_eq!(resp.pagination.total_pages, 3);
    }
}
