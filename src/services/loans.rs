//! Loan management service

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    access::{self, AccessControl},
    config::CatalogueConfig,
    error::{AppError, AppResult},
    models::{
        book_instance::{BookInstance, BookInstanceDetails, LoanStatus},
        pagination::{Page, PageRequest},
        today, Capability, UserClaims,
    },
    repository::Repository,
};

/// Renewal form: the copy and a suggested new due-back date
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RenewalProposal {
    pub instance: BookInstanceDetails,
    pub proposed_due_back: NaiveDate,
}

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    access: Arc<dyn AccessControl>,
    config: CatalogueConfig,
}

impl LoansService {
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

    /// Copies on loan to one borrower, soonest due first
    pub async fn instances_borrowed_by(
        &self,
        borrower_id: i32,
        request: &PageRequest,
    ) -> AppResult<Page<BookInstanceDetails>> {
        let page = request.resolve(self.config.default_page_size, self.config.max_page_size);
        let (items, total) = self
            .repository
            .instances
            .list_by_status(LoanStatus::OnLoan, Some(borrower_id), page)
            .await?;
        Ok(page.wrap(items, total))
    }

    /// Every copy on loan, soonest due first. Librarians only.
    pub async fn all_borrowed_instances(
        &self,
        caller: &UserClaims,
        request: &PageRequest,
    ) -> AppResult<Page<BookInstanceDetails>> {
        access::require(self.access.as_ref(), caller, Capability::CanMarkReturned)?;

        let page = request.resolve(self.config.default_page_size, self.config.max_page_size);
        let (items, total) = self
            .repository
            .instances
            .list_by_status(LoanStatus::OnLoan, None, page)
            .await?;
        Ok(page.wrap(items, total))
    }

    /// Suggested due-back date for a renewal form
    pub fn proposed_renewal_date(&self) -> NaiveDate {
        today() + Duration::weeks(self.config.renewal_default_weeks)
    }

    /// Load a copy for renewal along with the suggested date
    pub async fn renewal_proposal(
        &self,
        caller: &UserClaims,
        id: Uuid,
    ) -> AppResult<RenewalProposal> {
        access::require(self.access.as_ref(), caller, Capability::CanMarkReturned)?;

        let instance = self.repository.instances.get_details(id).await?;
        Ok(RenewalProposal {
            instance,
            proposed_due_back: self.proposed_renewal_date(),
        })
    }

    /// Set a new due-back date on a copy.
    ///
    /// The date may be today or later; it is not bounded above.
    pub async fn renew(
        &self,
        caller: &UserClaims,
        id: Uuid,
        due_back: NaiveDate,
    ) -> AppResult<BookInstance> {
        access::require(self.access.as_ref(), caller, Capability::CanMarkReturned)?;

        self.repository.instances.get(id).await?;

        if due_back < today() {
            return Err(AppError::Validation(
                "Invalid date - renewal in past".to_string(),
            ));
        }

        let instance = self.repository.instances.set_due_back(id, due_back).await?;
        tracing::info!(instance_id = %id, %due_back, user = %caller.sub, "loan renewed");
        Ok(instance)
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::assert_ok;

    use super::*;
    use crate::access::{ClaimsAccessControl, MockAccessControl};
    use crate::models::{
        book::CreateBook, book_instance::CreateBookInstance, borrower::CreateBorrower,
    };

    fn librarian() -> UserClaims {
        UserClaims::new(1, "librarian", vec![Capability::CanMarkReturned], 1)
    }

    fn member(user_id: i32) -> UserClaims {
        UserClaims::new(user_id, "member", vec![], 1)
    }

    fn service(repository: Repository) -> LoansService {
        LoansService::new(
            repository,
            Arc::new(ClaimsAccessControl),
            CatalogueConfig::default(),
        )
    }

    struct Fixture {
        repo: Repository,
        borrower_id: i32,
        early: Uuid,
        late: Uuid,
        other: Uuid,
    }

    /// Two copies on loan to one borrower, one to another, one available
    async fn fixture() -> Fixture {
        let repo = Repository::in_memory();
        let book = repo
            .books
            .create(&CreateBook {
                title: "Middlemarch".into(),
                author_id: None,
                summary: String::new(),
                isbn: "9780141439549".into(),
                genre_ids: vec![],
            })
            .await
            .unwrap();
        let reader = repo
            .borrowers
            .create(&CreateBorrower {
                username: "reader".into(),
                first_name: Some("Dorothea".into()),
                last_name: Some("Brooke".into()),
            })
            .await
            .unwrap();
        let other = repo
            .borrowers
            .create(&CreateBorrower {
                username: "other".into(),
                first_name: None,
                last_name: None,
            })
            .await
            .unwrap();

        let mut ids = Vec::new();
        let copies = [
            (LoanStatus::OnLoan, Some(reader.id), 10),
            (LoanStatus::OnLoan, Some(reader.id), 3),
            (LoanStatus::OnLoan, Some(other.id), 5),
            (LoanStatus::Available, None, 1),
        ];
        for (status, borrower_id, days) in copies {
            let copy = repo
                .instances
                .create(&CreateBookInstance {
                    book_id: book.id,
                    imprint: String::new(),
                    due_back: Some(today() + Duration::days(days)),
                    language_id: None,
                    borrower_id,
                    status,
                })
                .await
                .unwrap();
            ids.push(copy.id);
        }

        Fixture {
            repo,
            borrower_id: reader.id,
            late: ids[0],
            early: ids[1],
            other: ids[2],
        }
    }

    #[tokio::test]
    async fn test_borrowed_by_lists_own_loans_soonest_first() {
        let f = fixture().await;
        let svc = service(f.repo.clone());

        let page = svc
            .instances_borrowed_by(f.borrower_id, &PageRequest::default())
            .await
            .unwrap();
        let ids: Vec<Uuid> = page.items.iter().map(|d| d.instance.id).collect();
        assert_eq!(page.total, 2);
        assert_eq!(ids, vec![f.early, f.late]);
        assert!(page.items.iter().all(|d| d.borrower.as_deref() == Some("reader")));
    }

    #[tokio::test]
    async fn test_all_borrowed_requires_capability() {
        let f = fixture().await;
        let svc = service(f.repo.clone());

        let err = svc
            .all_borrowed_instances(&member(f.borrower_id), &PageRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied(_)));

        let page = svc
            .all_borrowed_instances(&librarian(), &PageRequest::default())
            .await
            .unwrap();
        let ids: Vec<Uuid> = page.items.iter().map(|d| d.instance.id).collect();
        assert_eq!(ids, vec![f.early, f.other, f.late]);
    }

    #[tokio::test]
    async fn test_all_borrowed_paginates() {
        let f = fixture().await;
        let svc = service(f.repo.clone());

        let page = svc
            .all_borrowed_instances(&librarian(), &PageRequest::new(2, 2))
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.page, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].instance.id, f.late);
    }

    #[tokio::test]
    async fn test_renew_sets_due_back() {
        let f = fixture().await;
        let svc = service(f.repo.clone());
        let new_date = today() + Duration::weeks(4);

        let renewed = assert_ok!(svc.renew(&librarian(), f.early, new_date).await);
        assert_eq!(renewed.due_back, Some(new_date));

        let stored = f.repo.instances.get(f.early).await.unwrap();
        assert_eq!(stored.due_back, Some(new_date));
    }

    #[tokio::test]
    async fn test_renew_today_accepted_past_rejected() {
        let f = fixture().await;
        let svc = service(f.repo.clone());

        assert_ok!(svc.renew(&librarian(), f.early, today()).await);

        let err = svc
            .renew(&librarian(), f.early, today() - Duration::days(1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let stored = f.repo.instances.get(f.early).await.unwrap();
        assert_eq!(stored.due_back, Some(today()));
    }

    #[tokio::test]
    async fn test_renew_without_capability_leaves_copy_untouched() {
        let f = fixture().await;
        let svc = service(f.repo.clone());
        let before = f.repo.instances.get(f.early).await.unwrap();

        let err = svc
            .renew(&member(f.borrower_id), f.early, today() + Duration::weeks(6))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied(_)));

        let after = f.repo.instances.get(f.early).await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_renew_unknown_copy() {
        let svc = service(Repository::in_memory());
        let err = svc
            .renew(&librarian(), Uuid::new_v4(), today())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_renew_far_future_allowed() {
        let f = fixture().await;
        let svc = service(f.repo.clone());
        let far = today() + Duration::weeks(52);
        assert_ok!(svc.renew(&librarian(), f.late, far).await);
    }

    #[tokio::test]
    async fn test_renew_consults_access_provider() {
        let f = fixture().await;
        let mut access = MockAccessControl::new();
        access
            .expect_has_capability()
            .withf(|caller, cap| caller.user_id == 7 && *cap == Capability::CanMarkReturned)
            .times(1)
            .return_const(true);
        let svc = LoansService::new(f.repo.clone(), Arc::new(access), CatalogueConfig::default());

        assert_ok!(svc.renew(&member(7), f.other, today()).await);
    }

    #[test]
    fn test_proposed_renewal_date_uses_configured_weeks() {
        let mut config = CatalogueConfig::default();
        let svc = LoansService::new(
            Repository::in_memory(),
            Arc::new(ClaimsAccessControl),
            config.clone(),
        );
        assert_eq!(svc.proposed_renewal_date(), today() + Duration::weeks(3));

        config.renewal_default_weeks = 1;
        let svc = LoansService::new(Repository::in_memory(), Arc::new(ClaimsAccessControl), config);
        assert_eq!(svc.proposed_renewal_date(), today() + Duration::days(7));
    }

    #[tokio::test]
    async fn test_renewal_proposal() {
        let f = fixture().await;
        let svc = service(f.repo.clone());
        let proposal = svc.renewal_proposal(&librarian(), f.early).await.unwrap();
        assert_eq!(proposal.instance.instance.id, f.early);
        assert_eq!(proposal.proposed_due_back, svc.proposed_renewal_date());
    }
}
