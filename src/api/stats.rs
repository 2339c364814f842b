//! Statistics endpoints

use axum::{extract::State, Json};

use crate::{error::AppResult, services::stats::SummaryCounts, AppState};

/// Catalogue summary counts
#[utoipa::path(
    get,
    path = "/stats",
    tag = "stats",
    responses(
        (status = 200, description = "Summary counts", body = SummaryCounts)
    )
)]
pub async fn summary_counts(State(state): State<AppState>) -> AppResult<Json<SummaryCounts>> {
    let counts = state.services.stats.summary_counts().await?;
    Ok(Json(counts))
}
