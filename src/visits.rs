//! Visit operations: draft creation and draft-window edits.

use chrono::Utc;
use rusqlite::Connection;
use tracing::{info, warn};
use uuid::Uuid;

use crate::claims;
use crate::db::repository::visit as visit_repo;
use crate::error::{LedgerError, LedgerResult};
use crate::guard;
use crate::models::enums::VisitStatus;
use crate::models::identity::Caller;
use crate::models::visit::{VisitDraft, VisitPatch, VisitRecord};

/// Create a new draft visit owned by `caller`.
///
/// The flagged bit is derived here from the assessment payload and is
/// never accepted from the caller directly.
pub fn create_draft_visit(
    conn: &Connection,
    caller: &Caller,
    draft: VisitDraft,
) -> LedgerResult<VisitRecord> {
    if draft.member_id.trim().is_empty() {
        return Err(LedgerError::InvalidArgument("member_id is required".into()));
    }
    if draft.rcfe_id.trim().is_empty() {
        return Err(LedgerError::InvalidArgument("rcfe_id is required".into()));
    }

    let now = Utc::now().naive_utc();
    let visit = VisitRecord {
        id: draft.id.unwrap_or_else(Uuid::new_v4),
        member_id: draft.member_id,
        member_name: draft.member_name,
        member_room: draft.member_room,
        rcfe_id: draft.rcfe_id,
        rcfe_name: draft.rcfe_name,
        rcfe_address: draft.rcfe_address,
        visit_date: draft.visit_date,
        created_at: now,
        updated_at: now,
        completed_at: draft.completed_at,
        submitted_at: None,
        social_worker_email: caller.email.clone(),
        social_worker_uid: Some(caller.uid.clone()),
        flagged: payload_is_flagged(draft.raw.as_ref()),
        raw: draft.raw,
        total_score: draft.total_score,
        status: VisitStatus::Draft,
        claim_id: None,
        claim_status: None,
        claim_submitted: false,
        claim_paid: false,
        signed_off: false,
    };

    visit_repo::insert_visit(conn, &visit)?;
    info!(visit_id = %visit.id, rcfe_id = %visit.rcfe_id, flagged = visit.flagged, "draft visit created");
    Ok(visit)
}

/// Apply a partial edit to a draft visit.
///
/// After the canonical record is written, any parent claim's
/// member_visits mirror is refreshed best-effort: a mirror failure is
/// logged and never rolls back the edit.
pub fn update_draft_visit(
    conn: &Connection,
    caller: &Caller,
    visit_id: &Uuid,
    patch: VisitPatch,
) -> LedgerResult<VisitRecord> {
    let mut visit = visit_repo::get_visit(conn, visit_id)?
        .ok_or_else(|| LedgerError::not_found("Visit", visit_id))?;

    guard::can_edit_visit(caller, &visit, &patch)?;

    if let Some(member_name) = patch.member_name {
        visit.member_name = member_name;
    }
    if let Some(member_room) = patch.member_room {
        visit.member_room = Some(member_room);
    }
    if let Some(rcfe_name) = patch.rcfe_name {
        visit.rcfe_name = rcfe_name;
    }
    if let Some(rcfe_address) = patch.rcfe_address {
        visit.rcfe_address = rcfe_address;
    }
    if let Some(completed_at) = patch.completed_at {
        visit.completed_at = Some(completed_at);
    }
    if let Some(total_score) = patch.total_score {
        visit.total_score = total_score;
    }
    if let Some(raw) = patch.raw {
        visit.flagged = payload_is_flagged(Some(&raw));
        visit.raw = Some(raw);
    }
    visit.updated_at = Utc::now().naive_utc();

    visit_repo::update_visit(conn, &visit)?;
    info!(visit_id = %visit.id, "draft visit updated");

    if let Some(claim_id) = visit.claim_id {
        if let Err(e) = claims::refresh_claim_mirror(conn, &claim_id) {
            warn!(claim_id = %claim_id, error = %e, "claim mirror refresh failed after visit edit");
        }
    }

    Ok(visit)
}

/// Fetch one visit, readable by its owner or an admin.
pub fn get_visit(conn: &Connection, caller: &Caller, visit_id: &Uuid) -> LedgerResult<VisitRecord> {
    let visit = visit_repo::get_visit(conn, visit_id)?
        .ok_or_else(|| LedgerError::not_found("Visit", visit_id))?;
    guard::can_view(
        caller,
        &visit.social_worker_email,
        visit.social_worker_uid.as_deref(),
    )?;
    Ok(visit)
}

/// A visit is flagged when its assessment payload carries a non-empty
/// top-level "flags" array.
fn payload_is_flagged(raw: Option<&serde_json::Value>) -> bool {
    raw.and_then(|v| v.get("flags"))
        .and_then(|f| f.as_array())
        .is_some_and(|flags| !flags.is_empty())
}
