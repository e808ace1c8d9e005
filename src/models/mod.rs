//! Data models for the library

pub mod enums;
pub mod loan;
pub mod person;
pub mod report;
pub mod resource;
pub mod search;
pub mod system_config;
pub mod user;

use serde::Serialize;

// Re-export commonly used types
pub use enums::{LoanStatus, PersonType, ResourceCondition, ResourceType, ReturnCondition, UserRole};
pub use loan::{Loan, LoanDetails};
pub use person::Person;
pub use resource::{Resource, StockCounters};
pub use system_config::SystemConfig;
pub use user::User;

/// Paginated response wrapper
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    /// Page content
    pub items: Vec<T>,
    /// Total number of matching rows
    pub total: i64,
    /// Current page number
    pub page: i64,
    /// Items per page
    pub per_page: i64,
}

pub const DEFAULT_PER_PAGE: i64 = 20;
pub const MAX_PER_PAGE: i64 = 100;
/// Highest page whose offset still fits in an `i64`
pub const MAX_PAGE: i64 = i64::MAX / MAX_PER_PAGE;

/// Page/size from optional query values, clamped to sane bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
}

impl Pagination {
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).clamp(1, MAX_PAGE),
            per_page: per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }

    pub fn into_response<T>(self, items: Vec<T>, total: i64) -> PaginatedResponse<T> {
        PaginatedResponse {
            items,
            total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_bounds() {
        assert_eq!(Pagination::new(None, None), Pagination { page: 1, per_page: 20 });
        assert_eq!(Pagination::new(Some(0), Some(1000)), Pagination { page: 1, per_page: 100 });
        assert_eq!(Pagination::new(Some(3), Some(10)).offset(), 20);
    }

    #[test]
    fn test_huge_page_does_not_overflow_offset() {
        let pagination = Pagination::new(Some(i64::MAX), Some(MAX_PER_PAGE));
        assert_eq!(pagination.page, MAX_PAGE);
        assert!(pagination.offset() > 0);

        let negative = Pagination::new(Some(i64::MIN), Some(-5));
        assert_eq!(negative, Pagination { page: 1, per_page: 1 });
        assert_eq!(negative.offset(), 0);
    }
}
