//! Borrowers repository

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::map_constraint_error;
use crate::{
    error::{AppError, AppResult},
    models::borrower::{Borrower, CreateBorrower},
};

#[async_trait]
pub trait BorrowerStore: Send + Sync {
    async fn get(&self, id: i32) -> AppResult<Borrower>;
    async fn create(&self, data: &CreateBorrower) -> AppResult<Borrower>;
    /// Remove an account; copies it had borrowed lose their borrower
    async fn delete(&self, id: i32) -> AppResult<()>;
}

#[derive(Clone)]
pub struct BorrowersRepository {
    pool: Pool<Postgres>,
}

impl BorrowersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BorrowerStore for BorrowersRepository {
    async fn get(&self, id: i32) -> AppResult<Borrower> {
        sqlx::query_as::<_, Borrower>(
            "SELECT id, username, first_name, last_name FROM borrowers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Borrower with id {} not found", id)))
    }

    async fn create(&self, data: &CreateBorrower) -> AppResult<Borrower> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM borrowers WHERE username = $1)")
                .bind(&data.username)
                .fetch_one(&self.pool)
                .await?;
        if exists {
            return Err(AppError::UniquenessViolation(format!(
                "Username {} already exists",
                data.username
            )));
        }

        sqlx::query_as::<_, Borrower>(
            r#"
            INSERT INTO borrowers (username, first_name, last_name)
            VALUES ($1, $2, $3)
            RETURNING id, username, first_name, last_name
            "#,
        )
        .bind(&data.username)
        .bind(&data.first_name)
        .bind(&data.last_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_constraint_error(e, "Username already exists"))
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        // book_instances.borrower_id is ON DELETE SET NULL
        let result = sqlx::query("DELETE FROM borrowers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Borrower with id {} not found", id)));
        }
        Ok(())
    }
}
