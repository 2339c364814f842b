//! Book (bibliographic record) model and related types.
//!
//! A `Book` describes a title, not a physical copy; copies are
//! [`BookInstance`](super::book_instance::BookInstance)s.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::author::Author;
use super::book_instance::BookInstance;
use super::genre::Genre;

/// Field labels and limits for books
pub mod fields {
    pub const TITLE_LABEL: &str = "title";
    pub const AUTHOR_LABEL: &str = "author";
    pub const SUMMARY_LABEL: &str = "summary";
    pub const ISBN_LABEL: &str = "ISBN";
    pub const GENRE_LABEL: &str = "Genre";
    pub const TITLE_MAX_LENGTH: u64 = 200;
    pub const SUMMARY_MAX_LENGTH: u64 = 1000;
    pub const ISBN_MAX_LENGTH: u64 = 13;
}

/// Number of genres shown by [`Book::display_genre`]
const DISPLAY_GENRE_LIMIT: usize = 3;

/// Book record. Listings are ordered by title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    /// Cleared when the author is deleted
    pub author_id: Option<i32>,
    pub summary: String,
    /// 13 character ISBN, unique across the catalogue
    pub isbn: String,
    #[sqlx(skip)]
    #[serde(default)]
    pub genres: Vec<Genre>,
}

impl Book {
    /// Comma separated names of the first three genres
    pub fn display_genre(&self) -> String {
        self.genres
            .iter()
            .take(DISPLAY_GENRE_LIMIT)
            .map(|g| g.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::fmt::Display for Book {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.title)
    }
}

/// Book with its author and physical copies
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookDetails {
    #[serde(flatten)]
    pub book: Book,
    pub author: Option<Author>,
    pub instances: Vec<BookInstance>,
}

/// Create book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
    pub author_id: Option<i32>,
    #[serde(default)]
    #[validate(length(max = 1000, message = "Summary must be at most 1000 characters"))]
    pub summary: String,
    #[validate(length(min = 1, max = 13, message = "ISBN must be 1-13 characters"))]
    pub isbn: String,
    #[serde(default)]
    pub genre_ids: Vec<i32>,
}

/// Update book request. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,
    /// `null` detaches the author
    #[serde(default, deserialize_with = "super::nullable::deserialize")]
    #[schema(value_type = Option<i32>)]
    pub author_id: Option<Option<i32>>,
    #[validate(length(max = 1000, message = "Summary must be at most 1000 characters"))]
    pub summary: Option<String>,
    #[validate(length(min = 1, max = 13, message = "ISBN must be 1-13 characters"))]
    pub isbn: Option<String>,
    /// Replaces the whole genre set when present
    pub genre_ids: Option<Vec<i32>>,
}

impl UpdateBook {
    /// Apply scalar fields of this patch; genres are resolved by the store
    pub fn apply(&self, book: &mut Book) {
        if let Some(ref title) = self.title {
            book.title = title.clone();
        }
        if let Some(author_id) = self.author_id {
            book.author_id = author_id;
        }
        if let Some(ref summary) = self.summary {
            book.summary = summary.clone();
        }
        if let Some(ref isbn) = self.isbn {
            book.isbn = isbn.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn genre(id: i32, name: &str) -> Genre {
        Genre {
            id,
            name: name.to_string(),
        }
    }

    fn book() -> Book {
        Book {
            id: 1,
            title: "Big".to_string(),
            author_id: None,
            summary: String::new(),
            isbn: "9780000000001".to_string(),
            genres: vec![],
        }
    }

    #[test]
    fn test_display_is_title() {
        assert_eq!(book().to_string(), "Big");
    }

    #[test]
    fn test_display_genre_takes_first_three() {
        let mut book = book();
        book.genres = vec![
            genre(1, "Fantasy"),
            genre(2, "Horror"),
            genre(3, "Poetry"),
            genre(4, "Romance"),
        ];
        assert_eq!(book.display_genre(), "Fantasy, Horror, Poetry");
    }

    #[test]
    fn test_display_genre_empty() {
        assert_eq!(book().display_genre(), "");
    }

    #[test]
    fn test_field_labels() {
        assert_eq!(fields::TITLE_LABEL, "title");
        assert_eq!(fields::AUTHOR_LABEL, "author");
        assert_eq!(fields::SUMMARY_LABEL, "summary");
        assert_eq!(fields::ISBN_LABEL, "ISBN");
        assert_eq!(fields::SUMMARY_MAX_LENGTH, 1000);
    }

    #[test]
    fn test_isbn_longer_than_thirteen_rejected() {
        let create = CreateBook {
            title: "Big".to_string(),
            author_id: None,
            summary: String::new(),
            isbn: "97800000000012".to_string(),
            genre_ids: vec![],
        };
        assert!(create.validate().is_err());
    }

    #[test]
    fn test_summary_limit() {
        let mut create = CreateBook {
            title: "Big".to_string(),
            author_id: None,
            summary: "s".repeat(1000),
            isbn: "9780000000001".to_string(),
            genre_ids: vec![],
        };
        assert!(create.validate().is_ok());
        create.summary.push('s');
        assert!(create.validate().is_err());
    }
}
