//! Monthly export endpoint.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::export;
use crate::models::identity::Caller;

#[derive(Deserialize)]
pub struct MonthlyExportQuery {
    /// YYYY-MM.
    pub month: String,
    /// Admin-only: export on behalf of another worker.
    pub owner_email: Option<String>,
}

/// `GET /api/export/monthly` — a worker's submitted visits for one
/// month with per-day fee aggregates.
pub async fn monthly(
    State(ctx): State<ApiContext>,
    caller: Caller,
    Query(query): Query<MonthlyExportQuery>,
) -> Result<Json<export::MonthlyExport>, ApiError> {
    let conn = ctx.db()?;
    let report = export::export_monthly_visits(
        &conn,
        &caller,
        &query.month,
        query.owner_email.as_deref(),
    )?;
    Ok(Json(report))
}
