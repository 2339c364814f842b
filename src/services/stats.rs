//! Statistics service

use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{book_instance::LoanStatus, today},
    repository::Repository,
};

/// Catalogue summary shown on the home page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SummaryCounts {
    pub books: i64,
    pub instances: i64,
    /// Copies with status available
    pub instances_available: i64,
    /// Copies with status on loan
    pub instances_on_loan: i64,
    /// On-loan copies past their due-back date
    pub instances_overdue: i64,
    pub genres: i64,
    pub authors: i64,
}

#[derive(Clone)]
pub struct StatsService {
    repository: Repository,
}

impl StatsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Count books, copies by status, genres and authors
    pub async fn summary_counts(&self) -> AppResult<SummaryCounts> {
        let repo = &self.repository;
        let (books, instances, available, on_loan, overdue, genres, authors) = tokio::try_join!(
            repo.books.count(),
            repo.instances.count(),
            repo.instances.count_by_status(LoanStatus::Available),
            repo.instances.count_by_status(LoanStatus::OnLoan),
            repo.instances.count_overdue(today()),
            repo.genres.count(),
            repo.authors.count(),
        )?;

        Ok(SummaryCounts {
            books,
            instances,
            instances_available: available,
            instances_on_loan: on_loan,
            instances_overdue: overdue,
            genres,
            authors,
        })
    }
}
