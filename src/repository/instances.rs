//! Book instances (copies) repository

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{FromRow, PgConnection, Pool, Postgres};
use uuid::Uuid;

use super::map_constraint_error;
use crate::{
    error::{AppError, AppResult},
    models::{
        book_instance::{
            BookInstance, BookInstanceDetails, CreateBookInstance, LoanStatus, UpdateBookInstance,
        },
        pagination::Pagination,
    },
};

#[async_trait]
pub trait InstanceStore: Send + Sync {
    async fn get(&self, id: Uuid) -> AppResult<BookInstance>;
    async fn get_details(&self, id: Uuid) -> AppResult<BookInstanceDetails>;
    /// Copies of one book ordered by due-back date
    async fn list_for_book(&self, book_id: i32) -> AppResult<Vec<BookInstance>>;
    /// Copies with the given status, optionally restricted to one borrower,
    /// ordered by due-back date ascending (undated last)
    async fn list_by_status(
        &self,
        status: LoanStatus,
        borrower_id: Option<i32>,
        page: Pagination,
    ) -> AppResult<(Vec<BookInstanceDetails>, i64)>;
    async fn create(&self, data: &CreateBookInstance) -> AppResult<BookInstance>;
    async fn update(&self, id: Uuid, data: &UpdateBookInstance) -> AppResult<BookInstance>;
    /// Replace the due-back date of a copy
    async fn set_due_back(&self, id: Uuid, due_back: NaiveDate) -> AppResult<BookInstance>;
    async fn delete(&self, id: Uuid) -> AppResult<()>;
    async fn count(&self) -> AppResult<i64>;
    async fn count_by_status(&self, status: LoanStatus) -> AppResult<i64>;
    /// On-loan copies due strictly before `today`
    async fn count_overdue(&self, today: NaiveDate) -> AppResult<i64>;
}

const INSTANCE_COLUMNS: &str = "id, book_id, imprint, due_back, language_id, borrower_id, status";

const DETAILS_SELECT: &str = r#"
    SELECT bi.id, bi.book_id, bi.imprint, bi.due_back, bi.language_id, bi.borrower_id, bi.status,
           b.title AS book_title, l.name AS language_name, br.username AS borrower_username
    FROM book_instances bi
    JOIN books b ON b.id = bi.book_id
    LEFT JOIN languages l ON l.id = bi.language_id
    LEFT JOIN borrowers br ON br.id = bi.borrower_id
"#;

#[derive(FromRow)]
struct InstanceDetailsRow {
    #[sqlx(flatten)]
    instance: BookInstance,
    book_title: String,
    language_name: Option<String>,
    borrower_username: Option<String>,
}

impl From<InstanceDetailsRow> for BookInstanceDetails {
    fn from(row: InstanceDetailsRow) -> Self {
        BookInstanceDetails::new(
            row.instance,
            row.book_title,
            row.language_name,
            row.borrower_username,
        )
    }
}

#[derive(Clone)]
pub struct InstancesRepository {
    pool: Pool<Postgres>,
}

impl InstancesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

/// Check that every id referenced by a copy resolves
async fn ensure_references(conn: &mut PgConnection, instance: &BookInstance) -> AppResult<()> {
    let (book, language, borrower): (bool, bool, bool) = sqlx::query_as(
        r#"
        SELECT EXISTS(SELECT 1 FROM books WHERE id = $1),
               ($2::int IS NULL OR EXISTS(SELECT 1 FROM languages WHERE id = $2)),
               ($3::int IS NULL OR EXISTS(SELECT 1 FROM borrowers WHERE id = $3))
        "#,
    )
    .bind(instance.book_id)
    .bind(instance.language_id)
    .bind(instance.borrower_id)
    .fetch_one(conn)
    .await?;

    if !book {
        return Err(AppError::NotFound(format!("Book with id {} not found", instance.book_id)));
    }
    if !language {
        return Err(AppError::NotFound("Language not found".to_string()));
    }
    if !borrower {
        return Err(AppError::NotFound("Borrower not found".to_string()));
    }
    Ok(())
}

#[async_trait]
impl InstanceStore for InstancesRepository {
    async fn get(&self, id: Uuid) -> AppResult<BookInstance> {
        sqlx::query_as::<_, BookInstance>(&format!(
            "SELECT {} FROM book_instances WHERE id = $1",
            INSTANCE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book instance {} not found", id)))
    }

    async fn get_details(&self, id: Uuid) -> AppResult<BookInstanceDetails> {
        let row = sqlx::query_as::<_, InstanceDetailsRow>(&format!(
            "{} WHERE bi.id = $1",
            DETAILS_SELECT
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book instance {} not found", id)))?;
        Ok(row.into())
    }

    async fn list_for_book(&self, book_id: i32) -> AppResult<Vec<BookInstance>> {
        let instances = sqlx::query_as::<_, BookInstance>(&format!(
            "SELECT {} FROM book_instances WHERE book_id = $1 ORDER BY due_back ASC NULLS LAST, id",
            INSTANCE_COLUMNS
        ))
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(instances)
    }

    async fn list_by_status(
        &self,
        status: LoanStatus,
        borrower_id: Option<i32>,
        page: Pagination,
    ) -> AppResult<(Vec<BookInstanceDetails>, i64)> {
        let rows = sqlx::query_as::<_, InstanceDetailsRow>(&format!(
            r#"{}
            WHERE bi.status = $1 AND ($2::int IS NULL OR bi.borrower_id = $2)
            ORDER BY bi.due_back ASC NULLS LAST, bi.id
            LIMIT $3 OFFSET $4"#,
            DETAILS_SELECT
        ))
        .bind(status)
        .bind(borrower_id)
        .bind(page.per_page)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM book_instances WHERE status = $1 AND ($2::int IS NULL OR borrower_id = $2)",
        )
        .bind(status)
        .bind(borrower_id)
        .fetch_one(&self.pool)
        .await?;

        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    async fn create(&self, data: &CreateBookInstance) -> AppResult<BookInstance> {
        let instance = BookInstance {
            id: Uuid::new_v4(),
            book_id: data.book_id,
            imprint: data.imprint.clone(),
            due_back: data.due_back,
            language_id: data.language_id,
            borrower_id: data.borrower_id,
            status: data.status,
        };

        let mut tx = self.pool.begin().await?;
        ensure_references(&mut tx, &instance).await?;

        let created = sqlx::query_as::<_, BookInstance>(&format!(
            r#"
            INSERT INTO book_instances (id, book_id, imprint, due_back, language_id, borrower_id, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            INSTANCE_COLUMNS
        ))
        .bind(instance.id)
        .bind(instance.book_id)
        .bind(&instance.imprint)
        .bind(instance.due_back)
        .bind(instance.language_id)
        .bind(instance.borrower_id)
        .bind(instance.status)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_constraint_error(e, "Referenced record no longer exists"))?;

        tx.commit().await?;
        Ok(created)
    }

    async fn update(&self, id: Uuid, data: &UpdateBookInstance) -> AppResult<BookInstance> {
        let mut tx = self.pool.begin().await?;

        let mut instance = sqlx::query_as::<_, BookInstance>(&format!(
            "SELECT {} FROM book_instances WHERE id = $1 FOR UPDATE",
            INSTANCE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book instance {} not found", id)))?;

        data.apply(&mut instance);
        ensure_references(&mut tx, &instance).await?;

        let updated = sqlx::query_as::<_, BookInstance>(&format!(
            r#"
            UPDATE book_instances
            SET book_id = $1, imprint = $2, due_back = $3, language_id = $4,
                borrower_id = $5, status = $6
            WHERE id = $7
            RETURNING {}
            "#,
            INSTANCE_COLUMNS
        ))
        .bind(instance.book_id)
        .bind(&instance.imprint)
        .bind(instance.due_back)
        .bind(instance.language_id)
        .bind(instance.borrower_id)
        .bind(instance.status)
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_constraint_error(e, "Referenced record no longer exists"))?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn set_due_back(&self, id: Uuid, due_back: NaiveDate) -> AppResult<BookInstance> {
        sqlx::query_as::<_, BookInstance>(&format!(
            "UPDATE book_instances SET due_back = $1 WHERE id = $2 RETURNING {}",
            INSTANCE_COLUMNS
        ))
        .bind(due_back)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book instance {} not found", id)))
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM book_instances WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book instance {} not found", id)));
        }
        Ok(())
    }

    async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book_instances")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn count_by_status(&self, status: LoanStatus) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book_instances WHERE status = $1")
            .bind(status)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn count_overdue(&self, today: NaiveDate) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM book_instances WHERE status = $1 AND due_back < $2",
        )
        .bind(LoanStatus::OnLoan)
        .bind(today)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
