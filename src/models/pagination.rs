//! Pagination request/response types

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::{Author, Book, BookInstanceDetails};

/// Page query parameters (1-based)
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams, ToSchema)]
pub struct PageRequest {
    /// Page number (default: 1)
    pub page: Option<i64>,
    /// Items per page (default from configuration)
    pub per_page: Option<i64>,
}

impl PageRequest {
    pub fn new(page: i64, per_page: i64) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
        }
    }

    /// Fill in defaults and clamp to sane bounds
    pub fn resolve(&self, default_per_page: i64, max_per_page: i64) -> Pagination {
        let max_per_page = max_per_page.max(1);
        Pagination {
            page: self.page.unwrap_or(1).max(1),
            per_page: self
                .per_page
                .unwrap_or(default_per_page)
                .clamp(1, max_per_page),
        }
    }
}

/// Resolved page window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
}

impl Pagination {
    /// Rows to skip; saturates for page numbers past any real catalogue
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }

    /// Slice an already ordered collection
    pub fn slice<T: Clone>(&self, all: &[T]) -> Vec<T> {
        let skip = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        let take = usize::try_from(self.per_page).unwrap_or(0);
        all.iter()
            .skip(skip)
            .take(take)
            .cloned()
            .collect()
    }

    pub fn wrap<T>(&self, items: Vec<T>, total: i64) -> Page<T> {
        Page {
            items,
            total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

/// Paginated response wrapper
#[derive(Debug, Clone, Serialize, ToSchema)]
#[aliases(
    AuthorPage = Page<Author>,
    BookPage = Page<Book>,
    InstancePage = Page<BookInstanceDetails>
)]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// Total number of matching items
    pub total: i64,
    /// Current page number
    pub page: i64,
    /// Items per page
    pub per_page: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_defaults() {
        let p = PageRequest::default().resolve(20, 100);
        assert_eq!(p, Pagination { page: 1, per_page: 20 });
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn test_resolve_clamps() {
        let p = PageRequest::new(0, 1000).resolve(20, 100);
        assert_eq!(p, Pagination { page: 1, per_page: 100 });

        let p = PageRequest::new(3, 0).resolve(20, 100);
        assert_eq!(p.per_page, 1);
        assert_eq!(p.offset(), 2);
    }

    #[test]
    fn test_slice() {
        let all: Vec<i32> = (1..=5).collect();
        assert_eq!(PageRequest::new(2, 2).resolve(20, 100).slice(&all), vec![3, 4]);
        assert_eq!(PageRequest::new(3, 2).resolve(20, 100).slice(&all), vec![5]);
        assert!(PageRequest::new(4, 2).resolve(20, 100).slice(&all).is_empty());
    }

    #[test]
    fn test_huge_page_number_is_empty() {
        let p = PageRequest::new(i64::MAX, 20).resolve(20, 100);
        assert_eq!(p.page, i64::MAX);
        assert_eq!(p.offset(), i64::MAX);

        let all: Vec<i32> = (1..=5).collect();
        assert!(p.slice(&all).is_empty());
    }
}
