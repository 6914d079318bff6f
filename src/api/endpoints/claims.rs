//! Claim endpoints: creation, submission, deletion and lookup.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::claims;
use crate::models::claim::{Claim, ClaimDetail};
use crate::models::identity::Caller;

#[derive(Deserialize)]
pub struct CreateClaimRequest {
    pub rcfe_id: String,
    pub claim_day: chrono::NaiveDate,
    pub visit_ids: Vec<Uuid>,
}

/// `POST /api/claims` — create a draft claim from draft visits.
pub async fn create(
    State(ctx): State<ApiContext>,
    caller: Caller,
    Json(request): Json<CreateClaimRequest>,
) -> Result<(StatusCode, Json<Claim>), ApiError> {
    let conn = ctx.db()?;
    let claim = claims::create_claim_from_visits(
        &conn,
        &caller,
        &request.rcfe_id,
        request.claim_day,
        &request.visit_ids,
    )?;
    Ok((StatusCode::CREATED, Json(claim)))
}

/// `POST /api/claims/:id/submit` — submit a draft claim.
pub async fn submit(
    State(ctx): State<ApiContext>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<Claim>, ApiError> {
    let conn = ctx.db()?;
    let claim = claims::submit_claim(&conn, &caller, &id)?;
    Ok(Json(claim))
}

/// `DELETE /api/claims/:id` — delete a draft claim, releasing its
/// visits.
pub async fn delete(
    State(ctx): State<ApiContext>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let conn = ctx.db()?;
    claims::delete_draft_claim(&conn, &caller, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/claims/:id` — full claim view with attestations and
/// audit trail.
pub async fn detail(
    State(ctx): State<ApiContext>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<ClaimDetail>, ApiError> {
    let conn = ctx.db()?;
    let detail = claims::lookup_claim(&conn, &caller, &id)?;
    Ok(Json(detail))
}
