//! Books repository

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use sqlx::{PgConnection, Pool, Postgres};

use super::map_constraint_error;
use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, CreateBook, UpdateBook},
        genre::Genre,
        pagination::Pagination,
    },
};

#[async_trait]
pub trait BookStore: Send + Sync {
    /// Page of books ordered by title, with genres, plus the total count
    async fn list(&self, page: Pagination) -> AppResult<(Vec<Book>, i64)>;
    /// Books attributed to an author, ordered by title
    async fn list_by_author(&self, author_id: i32) -> AppResult<Vec<Book>>;
    async fn get(&self, id: i32) -> AppResult<Book>;
    /// Fails with `UniquenessViolation` on a duplicate ISBN
    async fn create(&self, data: &CreateBook) -> AppResult<Book>;
    async fn update(&self, id: i32, data: &UpdateBook) -> AppResult<Book>;
    /// Fails with `ReferentialConflict` while copies of the book exist
    async fn delete(&self, id: i32) -> AppResult<()>;
    async fn count(&self) -> AppResult<i64>;
}

const BOOK_COLUMNS: &str = "id, title, author_id, summary, isbn";

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Attach genres (ordered by name) to each book
    async fn load_genres(&self, books: &mut [Book]) -> AppResult<()> {
        if books.is_empty() {
            return Ok(());
        }
        let ids: Vec<i32> = books.iter().map(|b| b.id).collect();

        let rows = sqlx::query_as::<_, (i32, i32, String)>(
            r#"
            SELECT bg.book_id, g.id, g.name
            FROM book_genres bg
            JOIN genres g ON g.id = bg.genre_id
            WHERE bg.book_id = ANY($1)
            ORDER BY g.name, g.id
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_book: HashMap<i32, Vec<Genre>> = HashMap::new();
        for (book_id, id, name) in rows {
            by_book.entry(book_id).or_default().push(Genre { id, name });
        }
        for book in books.iter_mut() {
            book.genres = by_book.remove(&book.id).unwrap_or_default();
        }
        Ok(())
    }
}

async fn isbn_taken(conn: &mut PgConnection, isbn: &str, exclude_id: Option<i32>) -> AppResult<bool> {
    let taken: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1 AND ($2::int IS NULL OR id <> $2))",
    )
    .bind(isbn)
    .bind(exclude_id)
    .fetch_one(conn)
    .await?;
    Ok(taken)
}

async fn ensure_author(conn: &mut PgConnection, author_id: Option<i32>) -> AppResult<()> {
    let Some(author_id) = author_id else {
        return Ok(());
    };
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM authors WHERE id = $1)")
        .bind(author_id)
        .fetch_one(conn)
        .await?;
    if !exists {
        return Err(AppError::NotFound(format!("Author with id {} not found", author_id)));
    }
    Ok(())
}

/// Replace the genre set of a book, checking every genre exists
async fn replace_genres(conn: &mut PgConnection, book_id: i32, genre_ids: &[i32]) -> AppResult<()> {
    let wanted: Vec<i32> = genre_ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();

    let found: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM genres WHERE id = ANY($1)")
        .bind(&wanted)
        .fetch_one(&mut *conn)
        .await?;
    if found != wanted.len() as i64 {
        return Err(AppError::NotFound("One or more genres not found".to_string()));
    }

    sqlx::query("DELETE FROM book_genres WHERE book_id = $1")
        .bind(book_id)
        .execute(&mut *conn)
        .await?;

    sqlx::query(
        "INSERT INTO book_genres (book_id, genre_id) SELECT $1, UNNEST($2::int[])",
    )
    .bind(book_id)
    .bind(&wanted)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

#[async_trait]
impl BookStore for BooksRepository {
    async fn list(&self, page: Pagination) -> AppResult<(Vec<Book>, i64)> {
        let mut books = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM books ORDER BY title, id LIMIT $1 OFFSET $2",
            BOOK_COLUMNS
        ))
        .bind(page.per_page)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        self.load_genres(&mut books).await?;
        let total = self.count().await?;
        Ok((books, total))
    }

    async fn list_by_author(&self, author_id: i32) -> AppResult<Vec<Book>> {
        let mut books = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM books WHERE author_id = $1 ORDER BY title, id",
            BOOK_COLUMNS
        ))
        .bind(author_id)
        .fetch_all(&self.pool)
        .await?;

        self.load_genres(&mut books).await?;
        Ok(books)
    }

    async fn get(&self, id: i32) -> AppResult<Book> {
        let book = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM books WHERE id = $1",
            BOOK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        let mut books = [book];
        self.load_genres(&mut books).await?;
        let [book] = books;
        Ok(book)
    }

    async fn create(&self, data: &CreateBook) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        if isbn_taken(&mut tx, &data.isbn, None).await? {
            return Err(AppError::UniquenessViolation(format!(
                "A book with ISBN {} already exists",
                data.isbn
            )));
        }
        ensure_author(&mut tx, data.author_id).await?;

        let book = sqlx::query_as::<_, Book>(&format!(
            "INSERT INTO books (title, author_id, summary, isbn) VALUES ($1, $2, $3, $4) RETURNING {}",
            BOOK_COLUMNS
        ))
        .bind(&data.title)
        .bind(data.author_id)
        .bind(&data.summary)
        .bind(&data.isbn)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_constraint_error(e, "A book with this ISBN already exists"))?;

        replace_genres(&mut tx, book.id, &data.genre_ids).await?;
        tx.commit().await?;

        self.get(book.id).await
    }

    async fn update(&self, id: i32, data: &UpdateBook) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let mut book = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM books WHERE id = $1 FOR UPDATE",
            BOOK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        data.apply(&mut book);

        if data.isbn.is_some() && isbn_taken(&mut tx, &book.isbn, Some(id)).await? {
            return Err(AppError::UniquenessViolation(format!(
                "A book with ISBN {} already exists",
                book.isbn
            )));
        }
        if data.author_id.is_some() {
            ensure_author(&mut tx, book.author_id).await?;
        }

        sqlx::query(
            "UPDATE books SET title = $1, author_id = $2, summary = $3, isbn = $4 WHERE id = $5",
        )
        .bind(&book.title)
        .bind(book.author_id)
        .bind(&book.summary)
        .bind(&book.isbn)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_constraint_error(e, "A book with this ISBN already exists"))?;

        if let Some(ref genre_ids) = data.genre_ids {
            replace_genres(&mut tx, id, genre_ids).await?;
        }
        tx.commit().await?;

        self.get(id).await
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let copies: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM book_instances WHERE book_id = $1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if copies > 0 {
            return Err(AppError::ReferentialConflict(format!(
                "Book {} still has {} copies",
                id, copies
            )));
        }

        // book_instances.book_id is ON DELETE RESTRICT; a copy created
        // concurrently surfaces as a foreign key violation
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_constraint_error(e, "Book still has copies"))?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
