//! In-process store implementing every store trait.
//!
//! All entities share one [`MemoryState`] behind a single lock so that
//! cross-entity policies (clearing references, refusing deletes) apply
//! atomically, as they do inside a database transaction.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AuthorStore, BookStore, BorrowerStore, GenreStore, InstanceStore, LanguageStore};
use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, CreateAuthor, UpdateAuthor},
        book::{Book, CreateBook, UpdateBook},
        book_instance::{
            BookInstance, BookInstanceDetails, CreateBookInstance, LoanStatus, UpdateBookInstance,
        },
        borrower::{Borrower, CreateBorrower},
        genre::{Genre, GenreInput},
        language::{Language, LanguageInput},
        pagination::Pagination,
    },
};

#[derive(Debug, Default)]
struct MemoryState {
    authors: BTreeMap<i32, Author>,
    genres: BTreeMap<i32, Genre>,
    languages: BTreeMap<i32, Language>,
    borrowers: BTreeMap<i32, Borrower>,
    books: BTreeMap<i32, Book>,
    /// Genre ids per book; `Book::genres` is resolved on read
    book_genres: BTreeMap<i32, BTreeSet<i32>>,
    instances: BTreeMap<Uuid, BookInstance>,
    sequences: Sequences,
}

/// Last id handed out per table, like one SERIAL each
#[derive(Debug, Default)]
struct Sequences {
    authors: i32,
    genres: i32,
    languages: i32,
    borrowers: i32,
    books: i32,
}

fn next_id(sequence: &mut i32) -> i32 {
    *sequence += 1;
    *sequence
}

impl MemoryState {
    fn book(&self, id: i32) -> AppResult<Book> {
        let mut book = self
            .books
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        let mut genres: Vec<Genre> = self
            .book_genres
            .get(&id)
            .into_iter()
            .flatten()
            .filter_map(|genre_id| self.genres.get(genre_id).cloned())
            .collect();
        genres.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        book.genres = genres;
        Ok(book)
    }

    fn isbn_taken(&self, isbn: &str, exclude_id: Option<i32>) -> bool {
        self.books
            .values()
            .any(|b| b.isbn == isbn && Some(b.id) != exclude_id)
    }

    fn ensure_author(&self, author_id: Option<i32>) -> AppResult<()> {
        match author_id {
            Some(id) if !self.authors.contains_key(&id) => Err(AppError::NotFound(format!(
                "Author with id {} not found",
                id
            ))),
            _ => Ok(()),
        }
    }

    fn resolve_genres(&self, genre_ids: &[i32]) -> AppResult<BTreeSet<i32>> {
        let wanted: BTreeSet<i32> = genre_ids.iter().copied().collect();
        if wanted.iter().all(|id| self.genres.contains_key(id)) {
            Ok(wanted)
        } else {
            Err(AppError::NotFound("One or more genres not found".to_string()))
        }
    }

    fn ensure_instance_references(&self, instance: &BookInstance) -> AppResult<()> {
        if !self.books.contains_key(&instance.book_id) {
            return Err(AppError::NotFound(format!(
                "Book with id {} not found",
                instance.book_id
            )));
        }
        if matches!(instance.language_id, Some(id) if !self.languages.contains_key(&id)) {
            return Err(AppError::NotFound("Language not found".to_string()));
        }
        if matches!(instance.borrower_id, Some(id) if !self.borrowers.contains_key(&id)) {
            return Err(AppError::NotFound("Borrower not found".to_string()));
        }
        Ok(())
    }

    fn details(&self, instance: &BookInstance) -> BookInstanceDetails {
        let book_title = self
            .books
            .get(&instance.book_id)
            .map(|b| b.title.clone())
            .unwrap_or_default();
        let language = instance
            .language_id
            .and_then(|id| self.languages.get(&id))
            .map(|l| l.name.clone());
        let borrower = instance
            .borrower_id
            .and_then(|id| self.borrowers.get(&id))
            .map(|b| b.username.clone());
        BookInstanceDetails::new(instance.clone(), book_title, language, borrower)
    }

    fn instance_mut(&mut self, id: Uuid) -> AppResult<&mut BookInstance> {
        self.instances
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Book instance {} not found", id)))
    }
}

/// Due-back ascending with undated copies last, ties broken by id
fn by_due_back(a: &BookInstance, b: &BookInstance) -> std::cmp::Ordering {
    match (a.due_back, b.due_back) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    }
    .then(a.id.cmp(&b.id))
}

/// Shared in-memory catalogue. Clones see the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuthorStore for MemoryStore {
    async fn list(&self, page: Pagination) -> AppResult<(Vec<Author>, i64)> {
        let state = self.state.read().await;
        let mut authors: Vec<Author> = state.authors.values().cloned().collect();
        authors.sort_by(|a, b| {
            a.last_name
                .cmp(&b.last_name)
                .then_with(|| a.first_name.cmp(&b.first_name))
                .then(a.id.cmp(&b.id))
        });
        Ok((page.slice(&authors), authors.len() as i64))
    }

    async fn get(&self, id: i32) -> AppResult<Author> {
        let state = self.state.read().await;
        state
            .authors
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", id)))
    }

    async fn create(&self, data: &CreateAuthor) -> AppResult<Author> {
        let mut state = self.state.write().await;
        let author = Author {
            id: next_id(&mut state.sequences.authors),
            first_name: data.first_name.clone(),
            last_name: data.last_name.clone(),
            date_of_birth: data.date_of_birth,
            date_of_death: data.date_of_death,
        };
        state.authors.insert(author.id, author.clone());
        Ok(author)
    }

    async fn update(&self, id: i32, data: &UpdateAuthor) -> AppResult<Author> {
        let mut state = self.state.write().await;
        let author = state
            .authors
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", id)))?;
        data.apply(author);
        Ok(author.clone())
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut state = self.state.write().await;
        if state.authors.remove(&id).is_none() {
            return Err(AppError::NotFound(format!("Author with id {} not found", id)));
        }
        for book in state.books.values_mut() {
            if book.author_id == Some(id) {
                book.author_id = None;
            }
        }
        Ok(())
    }

    async fn count(&self) -> AppResult<i64> {
        Ok(self.state.read().await.authors.len() as i64)
    }
}

#[async_trait]
impl GenreStore for MemoryStore {
    async fn list(&self) -> AppResult<Vec<Genre>> {
        let state = self.state.read().await;
        let mut genres: Vec<Genre> = state.genres.values().cloned().collect();
        genres.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(genres)
    }

    async fn get(&self, id: i32) -> AppResult<Genre> {
        let state = self.state.read().await;
        state
            .genres
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Genre with id {} not found", id)))
    }

    async fn create(&self, data: &GenreInput) -> AppResult<Genre> {
        let mut state = self.state.write().await;
        let genre = Genre {
            id: next_id(&mut state.sequences.genres),
            name: data.name.clone(),
        };
        state.genres.insert(genre.id, genre.clone());
        Ok(genre)
    }

    async fn update(&self, id: i32, data: &GenreInput) -> AppResult<Genre> {
        let mut state = self.state.write().await;
        let genre = state
            .genres
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Genre with id {} not found", id)))?;
        genre.name = data.name.clone();
        Ok(genre.clone())
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut state = self.state.write().await;
        if state.genres.remove(&id).is_none() {
            return Err(AppError::NotFound(format!("Genre with id {} not found", id)));
        }
        for genre_ids in state.book_genres.values_mut() {
            genre_ids.remove(&id);
        }
        Ok(())
    }

    async fn count(&self) -> AppResult<i64> {
        Ok(self.state.read().await.genres.len() as i64)
    }
}

#[async_trait]
impl LanguageStore for MemoryStore {
    async fn list(&self) -> AppResult<Vec<Language>> {
        let state = self.state.read().await;
        let mut languages: Vec<Language> = state.languages.values().cloned().collect();
        languages.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(languages)
    }

    async fn get(&self, id: i32) -> AppResult<Language> {
        let state = self.state.read().await;
        state
            .languages
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Language with id {} not found", id)))
    }

    async fn create(&self, data: &LanguageInput) -> AppResult<Language> {
        let mut state = self.state.write().await;
        let language = Language {
            id: next_id(&mut state.sequences.languages),
            name: data.name.clone(),
        };
        state.languages.insert(language.id, language.clone());
        Ok(language)
    }

    async fn update(&self, id: i32, data: &LanguageInput) -> AppResult<Language> {
        let mut state = self.state.write().await;
        let language = state
            .languages
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Language with id {} not found", id)))?;
        language.name = data.name.clone();
        Ok(language.clone())
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut state = self.state.write().await;
        if state.languages.remove(&id).is_none() {
            return Err(AppError::NotFound(format!("Language with id {} not found", id)));
        }
        for instance in state.instances.values_mut() {
            if instance.language_id == Some(id) {
                instance.language_id = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl BorrowerStore for MemoryStore {
    async fn get(&self, id: i32) -> AppResult<Borrower> {
        let state = self.state.read().await;
        state
            .borrowers
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Borrower with id {} not found", id)))
    }

    async fn create(&self, data: &CreateBorrower) -> AppResult<Borrower> {
        let mut state = self.state.write().await;
        if state.borrowers.values().any(|b| b.username == data.username) {
            return Err(AppError::UniquenessViolation(format!(
                "Username {} already exists",
                data.username
            )));
        }
        let borrower = Borrower {
            id: next_id(&mut state.sequences.borrowers),
            username: data.username.clone(),
            first_name: data.first_name.clone(),
            last_name: data.last_name.clone(),
        };
        state.borrowers.insert(borrower.id, borrower.clone());
        Ok(borrower)
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut state = self.state.write().await;
        if state.borrowers.remove(&id).is_none() {
            return Err(AppError::NotFound(format!("Borrower with id {} not found", id)));
        }
        for instance in state.instances.values_mut() {
            if instance.borrower_id == Some(id) {
                instance.borrower_id = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl BookStore for MemoryStore {
    async fn list(&self, page: Pagination) -> AppResult<(Vec<Book>, i64)> {
        let state = self.state.read().await;
        let mut books: Vec<Book> = state.books.values().cloned().collect();
        books.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        let total = books.len() as i64;
        let items = page
            .slice(&books)
            .into_iter()
            .map(|b| state.book(b.id))
            .collect::<AppResult<Vec<_>>>()?;
        Ok((items, total))
    }

    async fn list_by_author(&self, author_id: i32) -> AppResult<Vec<Book>> {
        let state = self.state.read().await;
        let mut books = state
            .books
            .values()
            .filter(|b| b.author_id == Some(author_id))
            .map(|b| state.book(b.id))
            .collect::<AppResult<Vec<_>>>()?;
        books.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(books)
    }

    async fn get(&self, id: i32) -> AppResult<Book> {
        self.state.read().await.book(id)
    }

    async fn create(&self, data: &CreateBook) -> AppResult<Book> {
        let mut state = self.state.write().await;
        if state.isbn_taken(&data.isbn, None) {
            return Err(AppError::UniquenessViolation(format!(
                "A book with ISBN {} already exists",
                data.isbn
            )));
        }
        state.ensure_author(data.author_id)?;
        let genre_ids = state.resolve_genres(&data.genre_ids)?;

        let id = next_id(&mut state.sequences.books);
        state.books.insert(
            id,
            Book {
                id,
                title: data.title.clone(),
                author_id: data.author_id,
                summary: data.summary.clone(),
                isbn: data.isbn.clone(),
                genres: Vec::new(),
            },
        );
        state.book_genres.insert(id, genre_ids);
        state.book(id)
    }

    async fn update(&self, id: i32, data: &UpdateBook) -> AppResult<Book> {
        let mut state = self.state.write().await;
        let mut book = state.book(id)?;
        data.apply(&mut book);

        if data.isbn.is_some() && state.isbn_taken(&book.isbn, Some(id)) {
            return Err(AppError::UniquenessViolation(format!(
                "A book with ISBN {} already exists",
                book.isbn
            )));
        }
        if data.author_id.is_some() {
            state.ensure_author(book.author_id)?;
        }
        let genre_ids = match data.genre_ids {
            Some(ref ids) => Some(state.resolve_genres(ids)?),
            None => None,
        };

        book.genres = Vec::new();
        state.books.insert(id, book);
        if let Some(genre_ids) = genre_ids {
            state.book_genres.insert(id, genre_ids);
        }
        state.book(id)
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut state = self.state.write().await;
        if !state.books.contains_key(&id) {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        let copies = state.instances.values().filter(|i| i.book_id == id).count();
        if copies > 0 {
            return Err(AppError::ReferentialConflict(format!(
                "Book {} still has {} copies",
                id, copies
            )));
        }
        state.books.remove(&id);
        state.book_genres.remove(&id);
        Ok(())
    }

    async fn count(&self) -> AppResult<i64> {
        Ok(self.state.read().await.books.len() as i64)
    }
}

#[async_trait]
impl InstanceStore for MemoryStore {
    async fn get(&self, id: Uuid) -> AppResult<BookInstance> {
        let state = self.state.read().await;
        state
            .instances
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Book instance {} not found", id)))
    }

    async fn get_details(&self, id: Uuid) -> AppResult<BookInstanceDetails> {
        let state = self.state.read().await;
        let instance = state
            .instances
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Book instance {} not found", id)))?;
        Ok(state.details(instance))
    }

    async fn list_for_book(&self, book_id: i32) -> AppResult<Vec<BookInstance>> {
        let state = self.state.read().await;
        let mut instances: Vec<BookInstance> = state
            .instances
            .values()
            .filter(|i| i.book_id == book_id)
            .cloned()
            .collect();
        instances.sort_by(by_due_back);
        Ok(instances)
    }

    async fn list_by_status(
        &self,
        status: LoanStatus,
        borrower_id: Option<i32>,
        page: Pagination,
    ) -> AppResult<(Vec<BookInstanceDetails>, i64)> {
        let state = self.state.read().await;
        let mut matching: Vec<BookInstance> = state
            .instances
            .values()
            .filter(|i| i.status == status)
            .filter(|i| borrower_id.is_none() || i.borrower_id == borrower_id)
            .cloned()
            .collect();
        matching.sort_by(by_due_back);

        let items: Vec<BookInstanceDetails> = page
            .slice(&matching)
            .iter()
            .map(|i| state.details(i))
            .collect();
        Ok((items, matching.len() as i64))
    }

    async fn create(&self, data: &CreateBookInstance) -> AppResult<BookInstance> {
        let mut state = self.state.write().await;
        let instance = BookInstance {
            id: Uuid::new_v4(),
            book_id: data.book_id,
            imprint: data.imprint.clone(),
            due_back: data.due_back,
            language_id: data.language_id,
            borrower_id: data.borrower_id,
            status: data.status,
        };
        state.ensure_instance_references(&instance)?;
        state.instances.insert(instance.id, instance.clone());
        Ok(instance)
    }

    async fn update(&self, id: Uuid, data: &UpdateBookInstance) -> AppResult<BookInstance> {
        let mut state = self.state.write().await;
        let mut instance = state.instance_mut(id)?.clone();
        data.apply(&mut instance);
        state.ensure_instance_references(&instance)?;
        state.instances.insert(id, instance.clone());
        Ok(instance)
    }

    async fn set_due_back(&self, id: Uuid, due_back: NaiveDate) -> AppResult<BookInstance> {
        let mut state = self.state.write().await;
        let instance = state.instance_mut(id)?;
        instance.due_back = Some(due_back);
        Ok(instance.clone())
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut state = self.state.write().await;
        state
            .instances
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("Book instance {} not found", id)))
    }

    async fn count(&self) -> AppResult<i64> {
        Ok(self.state.read().await.instances.len() as i64)
    }

    async fn count_by_status(&self, status: LoanStatus) -> AppResult<i64> {
        let state = self.state.read().await;
        Ok(state.instances.values().filter(|i| i.status == status).count() as i64)
    }

    async fn count_overdue(&self, today: NaiveDate) -> AppResult<i64> {
        let state = self.state.read().await;
        Ok(state
            .instances
            .values()
            .filter(|i| i.status == LoanStatus::OnLoan && i.is_overdue_on(today))
            .count() as i64)
    }
}
