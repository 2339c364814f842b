//! Repository layer: entity storage behind async traits.
//!
//! Each entity has a store trait with a PostgreSQL implementation next to
//! it. [`memory::MemoryStore`] implements every trait over one shared
//! in-process state for tests and database-less runs. Both backends enforce
//! the same referential policies:
//!
//! * deleting an author, language or borrower clears references to it;
//! * deleting a genre removes it from every book;
//! * deleting a book is refused while copies of it exist;
//! * ISBNs and borrower usernames are unique.

pub mod authors;
pub mod books;
pub mod borrowers;
pub mod genres;
pub mod instances;
pub mod languages;
pub mod memory;

use std::sync::Arc;

use sqlx::{Pool, Postgres};

use crate::error::AppError;

pub use authors::AuthorStore;
pub use books::BookStore;
pub use borrowers::BorrowerStore;
pub use genres::GenreStore;
pub use instances::InstanceStore;
pub use languages::LanguageStore;

/// SQLSTATE unique_violation
const UNIQUE_VIOLATION: &str = "23505";
/// SQLSTATE foreign_key_violation
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Main repository struct holding one store per entity
#[derive(Clone)]
pub struct Repository {
    pub authors: Arc<dyn AuthorStore>,
    pub genres: Arc<dyn GenreStore>,
    pub languages: Arc<dyn LanguageStore>,
    pub books: Arc<dyn BookStore>,
    pub instances: Arc<dyn InstanceStore>,
    pub borrowers: Arc<dyn BorrowerStore>,
}

impl Repository {
    /// Create a repository backed by the given database pool
    pub fn postgres(pool: Pool<Postgres>) -> Self {
        Self {
            authors: Arc::new(authors::AuthorsRepository::new(pool.clone())),
            genres: Arc::new(genres::GenresRepository::new(pool.clone())),
            languages: Arc::new(languages::LanguagesRepository::new(pool.clone())),
            books: Arc::new(books::BooksRepository::new(pool.clone())),
            instances: Arc::new(instances::InstancesRepository::new(pool.clone())),
            borrowers: Arc::new(borrowers::BorrowersRepository::new(pool)),
        }
    }

    /// Create a repository backed by a fresh in-process store
    pub fn in_memory() -> Self {
        let store = Arc::new(memory::MemoryStore::new());
        Self {
            authors: store.clone(),
            genres: store.clone(),
            languages: store.clone(),
            books: store.clone(),
            instances: store.clone(),
            borrowers: store,
        }
    }
}

/// Translate constraint violations raised by PostgreSQL into the
/// catalogue error taxonomy; anything else stays a database error.
pub(crate) fn map_constraint_error(err: sqlx::Error, context: &str) -> AppError {
    let code = err
        .as_database_error()
        .and_then(|db| db.code())
        .map(|code| code.into_owned());

    match code.as_deref() {
        Some(UNIQUE_VIOLATION) => AppError::UniquenessViolation(context.to_string()),
        Some(FOREIGN_KEY_VIOLATION) => AppError::ReferentialConflict(context.to_string()),
        _ => AppError::Database(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_pass_through() {
        let err = map_constraint_error(sqlx::Error::RowNotFound, "books");
        assert!(matches!(err, AppError::Database(sqlx::Error::RowNotFound)));
    }
}
