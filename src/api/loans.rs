//! Loan endpoints: borrowed listings and renewal

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        book_instance::{BookInstance, BookInstanceDetails},
        pagination::{InstancePage, Page, PageRequest},
    },
    services::loans::RenewalProposal,
    AppState,
};

use super::AuthenticatedUser;

/// Renew request
#[derive(Debug, Deserialize, ToSchema)]
pub struct RenewRequest {
    /// New due-back date (today or later)
    pub due_back: NaiveDate,
}

/// Copies on loan to the caller
#[utoipa::path(
    get,
    path = "/loans/mine",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(PageRequest),
    responses(
        (status = 200, description = "Caller's loans, soonest due first", body = InstancePage),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn my_loans(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(request): Query<PageRequest>,
) -> AppResult<Json<Page<BookInstanceDetails>>> {
    let page = state
        .services
        .loans
        .instances_borrowed_by(claims.user_id, &request)
        .await?;
    Ok(Json(page))
}

/// Every copy on loan
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(PageRequest),
    responses(
        (status = 200, description = "All loans, soonest due first", body = InstancePage),
        (status = 403, description = "Missing capability")
    )
)]
pub async fn all_borrowed(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(request): Query<PageRequest>,
) -> AppResult<Json<Page<BookInstanceDetails>>> {
    let page = state
        .services
        .loans
        .all_borrowed_instances(&claims, &request)
        .await?;
    Ok(Json(page))
}

/// Renewal form with a proposed due-back date
#[utoipa::path(
    get,
    path = "/instances/{id}/renew",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Copy ID")),
    responses(
        (status = 200, description = "Copy and proposed date", body = RenewalProposal),
        (status = 403, description = "Missing capability"),
        (status = 404, description = "Copy not found")
    )
)]
pub async fn renewal_proposal(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RenewalProposal>> {
    let proposal = state.services.loans.renewal_proposal(&claims, id).await?;
    Ok(Json(proposal))
}

/// Renew a loan
#[utoipa::path(
    post,
    path = "/instances/{id}/renew",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Copy ID")),
    request_body = RenewRequest,
    responses(
        (status = 200, description = "Due-back date replaced", body = BookInstance),
        (status = 400, description = "Date in the past"),
        (status = 403, description = "Missing capability"),
        (status = 404, description = "Copy not found")
    )
)]
pub async fn renew_instance(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<RenewRequest>,
) -> AppResult<Json<BookInstance>> {
    let instance = state
        .services
        .loans
        .renew(&claims, id, request.due_back)
        .await?;
    Ok(Json(instance))
}
