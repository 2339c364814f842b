//! Data models for the catalogue

pub mod author;
pub mod book;
pub mod book_instance;
pub mod borrower;
pub mod genre;
pub mod language;
pub mod pagination;
pub mod user;

// Re-export commonly used types
pub use author::{Author, AuthorDetails};
pub use book::{Book, BookDetails};
pub use book_instance::{BookInstance, BookInstanceDetails, LoanStatus};
pub use borrower::Borrower;
pub use genre::Genre;
pub use language::Language;
pub use pagination::{Page, PageRequest};
pub use user::{Capability, UserClaims};

use chrono::NaiveDate;

/// Current local calendar date
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Serde helper for patch fields where `null` means "clear" and an absent
/// key means "leave unchanged". Use with `#[serde(default)]`.
pub(crate) mod nullable {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::book::UpdateBook;

    #[test]
    fn test_nullable_absent_vs_null() {
        let absent: UpdateBook = serde_json::from_str(r#"{"title": "Dune"}"#).unwrap();
        assert_eq!(absent.author_id, None);

        let cleared: UpdateBook = serde_json::from_str(r#"{"author_id": null}"#).unwrap();
        assert_eq!(cleared.author_id, Some(None));

        let set: UpdateBook = serde_json::from_str(r#"{"author_id": 7}"#).unwrap();
        assert_eq!(set.author_id, Some(Some(7)));
    }
}
