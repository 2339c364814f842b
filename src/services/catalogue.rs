//! Catalogue management service
//!
//! Reads are open to everyone. Every mutation requires the
//! `can_mark_returned` capability and validated input.

use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::{
    access::{self, AccessControl},
    config::CatalogueConfig,
    error::{AppError, AppResult},
    models::{
        author::{validate_lifespan, Author, AuthorDetails, CreateAuthor, UpdateAuthor},
        book::{Book, BookDetails, CreateBook, UpdateBook},
        book_instance::{BookInstance, BookInstanceDetails, CreateBookInstance, UpdateBookInstance},
        borrower::{Borrower, CreateBorrower},
        genre::{Genre, GenreInput},
        language::{Language, LanguageInput},
        pagination::{Page, PageRequest},
        Capability, UserClaims,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogueService {
    repository: Repository,
    access: Arc<dyn AccessControl>,
    config: CatalogueConfig,
}

impl CatalogueService {
    pub fn new(
        repository: Repository,
        access: Arc<dyn AccessControl>,
        config: CatalogueConfig,
    ) -> Self {
        Self {
            repository,
            access,
            config,
        }
    }

    fn require_librarian(&self, caller: &UserClaims) -> AppResult<()> {
        access::require(self.access.as_ref(), caller, Capability::CanMarkReturned)
    }

    // ---- Authors ----

    /// List authors ordered by last name then first name
    pub async fn list_authors(&self, request: &PageRequest) -> AppResult<Page<Author>> {
        let page = request.resolve(self.config.default_page_size, self.config.max_page_size);
        let (authors, total) = self.repository.authors.list(page).await?;
        Ok(page.wrap(authors, total))
    }

    /// Get an author with their books
    pub async fn get_author(&self, id: i32) -> AppResult<AuthorDetails> {
        let author = self.repository.authors.get(id).await?;
        let books = self.repository.books.list_by_author(id).await?;
        Ok(AuthorDetails { author, books })
    }

    pub async fn create_author(&self, caller: &UserClaims, data: CreateAuthor) -> AppResult<Author> {
        self.require_librarian(caller)?;
        data.validate()?;
        validate_lifespan(data.date_of_birth, data.date_of_death).map_err(AppError::Validation)?;

        let author = self.repository.authors.create(&data).await?;
        tracing::info!(author_id = author.id, user = %caller.sub, "author created");
        Ok(author)
    }

    pub async fn update_author(
        &self,
        caller: &UserClaims,
        id: i32,
        data: UpdateAuthor,
    ) -> AppResult<Author> {
        self.require_librarian(caller)?;
        data.validate()?;

        let mut preview = self.repository.authors.get(id).await?;
        data.apply(&mut preview);
        validate_lifespan(preview.date_of_birth, preview.date_of_death)
            .map_err(AppError::Validation)?;

        let author = self.repository.authors.update(id, &data).await?;
        tracing::info!(author_id = id, user = %caller.sub, "author updated");
        Ok(author)
    }

    /// Delete an author; their books stay with no author
    pub async fn delete_author(&self, caller: &UserClaims, id: i32) -> AppResult<()> {
        self.require_librarian(caller)?;
        self.repository.authors.delete(id).await?;
        tracing::info!(author_id = id, user = %caller.sub, "author deleted");
        Ok(())
    }

    // ---- Genres ----

    pub async fn list_genres(&self) -> AppResult<Vec<Genre>> {
        self.repository.genres.list().await
    }

    pub async fn create_genre(&self, caller: &UserClaims, data: GenreInput) -> AppResult<Genre> {
        self.require_librarian(caller)?;
        data.validate()?;
        let genre = self.repository.genres.create(&data).await?;
        tracing::info!(genre_id = genre.id, name = %genre.name, "genre created");
        Ok(genre)
    }

    pub async fn update_genre(
        &self,
        caller: &UserClaims,
        id: i32,
        data: GenreInput,
    ) -> AppResult<Genre> {
        self.require_librarian(caller)?;
        data.validate()?;
        let genre = self.repository.genres.update(id, &data).await?;
        tracing::info!(genre_id = id, name = %genre.name, "genre renamed");
        Ok(genre)
    }

    /// Delete a genre and drop it from every book
    pub async fn delete_genre(&self, caller: &UserClaims, id: i32) -> AppResult<()> {
        self.require_librarian(caller)?;
        self.repository.genres.delete(id).await?;
        tracing::info!(genre_id = id, "genre deleted");
        Ok(())
    }

    // ---- Languages ----

    pub async fn list_languages(&self) -> AppResult<Vec<Language>> {
        self.repository.languages.list().await
    }

    pub async fn create_language(
        &self,
        caller: &UserClaims,
        data: LanguageInput,
    ) -> AppResult<Language> {
        self.require_librarian(caller)?;
        data.validate()?;
        let language = self.repository.languages.create(&data).await?;
        tracing::info!(language_id = language.id, name = %language.name, "language created");
        Ok(language)
    }

    pub async fn update_language(
        &self,
        caller: &UserClaims,
        id: i32,
        data: LanguageInput,
    ) -> AppResult<Language> {
        self.require_librarian(caller)?;
        data.validate()?;
        let language = self.repository.languages.update(id, &data).await?;
        tracing::info!(language_id = id, name = %language.name, "language renamed");
        Ok(language)
    }

    pub async fn delete_language(&self, caller: &UserClaims, id: i32) -> AppResult<()> {
        self.require_librarian(caller)?;
        self.repository.languages.delete(id).await?;
        tracing::info!(language_id = id, "language deleted");
        Ok(())
    }

    // ---- Books ----

    /// List books ordered by title
    pub async fn list_books(&self, request: &PageRequest) -> AppResult<Page<Book>> {
        let page = request.resolve(self.config.default_page_size, self.config.max_page_size);
        let (books, total) = self.repository.books.list(page).await?;
        Ok(page.wrap(books, total))
    }

    /// Get a book with its author and copies
    pub async fn get_book(&self, id: i32) -> AppResult<BookDetails> {
        let book = self.repository.books.get(id).await?;
        let author = match book.author_id {
            Some(author_id) => Some(self.repository.authors.get(author_id).await?),
            None => None,
        };
        let instances = self.repository.instances.list_for_book(id).await?;
        Ok(BookDetails {
            book,
            author,
            instances,
        })
    }

    pub async fn create_book(&self, caller: &UserClaims, data: CreateBook) -> AppResult<Book> {
        self.require_librarian(caller)?;
        data.validate()?;
        let book = self.repository.books.create(&data).await?;
        tracing::info!(book_id = book.id, isbn = %book.isbn, user = %caller.sub, "book created");
        Ok(book)
    }

    pub async fn update_book(
        &self,
        caller: &UserClaims,
        id: i32,
        data: UpdateBook,
    ) -> AppResult<Book> {
        self.require_librarian(caller)?;
        data.validate()?;
        let book = self.repository.books.update(id, &data).await?;
        tracing::info!(book_id = id, user = %caller.sub, "book updated");
        Ok(book)
    }

    /// Delete a book. Refused while copies of it exist.
    pub async fn delete_book(&self, caller: &UserClaims, id: i32) -> AppResult<()> {
        self.require_librarian(caller)?;
        self.repository.books.delete(id).await?;
        tracing::info!(book_id = id, user = %caller.sub, "book deleted");
        Ok(())
    }

    // ---- Copies ----

    pub async fn get_instance(&self, id: Uuid) -> AppResult<BookInstanceDetails> {
        self.repository.instances.get_details(id).await
    }

    pub async fn create_instance(
        &self,
        caller: &UserClaims,
        data: CreateBookInstance,
    ) -> AppResult<BookInstance> {
        self.require_librarian(caller)?;
        data.validate()?;
        let instance = self.repository.instances.create(&data).await?;
        tracing::info!(
            instance_id = %instance.id,
            book_id = instance.book_id,
            status = %instance.status,
            "book instance created"
        );
        Ok(instance)
    }

    /// Update a copy. Any status may replace any other.
    pub async fn update_instance(
        &self,
        caller: &UserClaims,
        id: Uuid,
        data: UpdateBookInstance,
    ) -> AppResult<BookInstance> {
        self.require_librarian(caller)?;
        data.validate()?;
        let instance = self.repository.instances.update(id, &data).await?;
        tracing::info!(instance_id = %id, status = %instance.status, "book instance updated");
        Ok(instance)
    }

    pub async fn delete_instance(&self, caller: &UserClaims, id: Uuid) -> AppResult<()> {
        self.require_librarian(caller)?;
        self.repository.instances.delete(id).await?;
        tracing::info!(instance_id = %id, "book instance deleted");
        Ok(())
    }

    // ---- Borrowers ----

    pub async fn get_borrower(&self, id: i32) -> AppResult<Borrower> {
        self.repository.borrowers.get(id).await
    }

    pub async fn create_borrower(
        &self,
        caller: &UserClaims,
        data: CreateBorrower,
    ) -> AppResult<Borrower> {
        self.require_librarian(caller)?;
        data.validate()?;
        let borrower = self.repository.borrowers.create(&data).await?;
        tracing::info!(borrower_id = borrower.id, username = %borrower.username, "borrower registered");
        Ok(borrower)
    }

    /// Remove a borrower; copies they held keep their status but lose the borrower
    pub async fn delete_borrower(&self, caller: &UserClaims, id: i32) -> AppResult<()> {
        self.require_librarian(caller)?;
        self.repository.borrowers.delete(id).await?;
        tracing::info!(borrower_id = id, "borrower removed");
        Ok(())
    }
}
