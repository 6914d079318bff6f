//! Sign-off endpoint.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::claim::SignOffAttestation;
use crate::models::identity::Caller;
use crate::signoff;

#[derive(Deserialize)]
pub struct SignOffRequest {
    pub rcfe_id: String,
    pub visit_ids: Vec<Uuid>,
    pub attestation: SignOffAttestation,
}

/// `POST /api/sign-offs` — record a facility attestation over a batch
/// of submitted visits.
pub async fn record(
    State(ctx): State<ApiContext>,
    caller: Caller,
    Json(request): Json<SignOffRequest>,
) -> Result<Json<signoff::SignOffSummary>, ApiError> {
    let conn = ctx.db()?;
    let summary = signoff::record_sign_off(
        &conn,
        &caller,
        &request.rcfe_id,
        &request.visit_ids,
        request.attestation,
    )?;
    Ok(Json(summary))
}
