//! Visit endpoints: draft creation, draft edits and candidate listings.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::matcher;
use crate::models::identity::Caller;
use crate::models::visit::{VisitDraft, VisitPatch, VisitRecord};
use crate::visits;

/// `POST /api/visits` — create a draft visit.
pub async fn create(
    State(ctx): State<ApiContext>,
    caller: Caller,
    Json(draft): Json<VisitDraft>,
) -> Result<Json<VisitRecord>, ApiError> {
    let conn = ctx.db()?;
    let visit = visits::create_draft_visit(&conn, &caller, draft)?;
    Ok(Json(visit))
}

/// `PATCH /api/visits/:id` — edit a draft visit.
pub async fn update(
    State(ctx): State<ApiContext>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(patch): Json<VisitPatch>,
) -> Result<Json<VisitRecord>, ApiError> {
    let conn = ctx.db()?;
    let visit = visits::update_draft_visit(&conn, &caller, &id, patch)?;
    Ok(Json(visit))
}

/// `GET /api/visits/:id` — fetch one visit.
pub async fn detail(
    State(ctx): State<ApiContext>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<VisitRecord>, ApiError> {
    let conn = ctx.db()?;
    let visit = visits::get_visit(&conn, &caller, &id)?;
    Ok(Json(visit))
}

#[derive(Deserialize)]
pub struct DraftCandidatesQuery {
    pub rcfe_id: String,
    pub day: chrono::NaiveDate,
}

/// `GET /api/visits/draft-candidates` — claimable draft visits for a
/// facility-day.
pub async fn draft_candidates(
    State(ctx): State<ApiContext>,
    caller: Caller,
    Query(query): Query<DraftCandidatesQuery>,
) -> Result<Json<matcher::CandidateSet>, ApiError> {
    let conn = ctx.db()?;
    let set = matcher::find_draft_candidates(&conn, &caller, &query.rcfe_id, query.day)?;
    Ok(Json(set))
}

#[derive(Deserialize)]
pub struct SignOffCandidatesQuery {
    pub rcfe_id: String,
    pub day: chrono::NaiveDate,
}

/// `GET /api/visits/sign-off-candidates` — visits awaiting attestation
/// for a facility-day, one per member.
pub async fn sign_off_candidates(
    State(ctx): State<ApiContext>,
    caller: Caller,
    Query(query): Query<SignOffCandidatesQuery>,
) -> Result<Json<matcher::CandidateSet>, ApiError> {
    let conn = ctx.db()?;
    let set = matcher::find_sign_off_candidates(&conn, &caller, &query.rcfe_id, query.day)?;
    Ok(Json(set))
}
