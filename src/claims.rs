//! Claim operations: creation, submission, deletion and lookup.
//!
//! Multi-row lifecycle changes run inside a single transaction, and
//! submission re-checks the guard on rows re-read inside that
//! transaction so a racing sign-off or earlier submission wins.

use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::repository::claim as claim_repo;
use crate::db::repository::claim_event as event_repo;
use crate::db::repository::signoff as signoff_repo;
use crate::db::repository::visit as visit_repo;
use crate::error::{LedgerError, LedgerResult};
use crate::fees;
use crate::guard;
use crate::models::claim::{claim_month_of, Claim, ClaimDetail};
use crate::models::enums::ClaimStatus;
use crate::models::identity::Caller;
use crate::models::visit::VisitSummary;

/// Create a draft claim from a set of draft visits at one facility on
/// one day. All visits are attached atomically or none are.
pub fn create_claim_from_visits(
    conn: &Connection,
    caller: &Caller,
    rcfe_id: &str,
    day: NaiveDate,
    visit_ids: &[Uuid],
) -> LedgerResult<Claim> {
    if visit_ids.is_empty() {
        return Err(LedgerError::InvalidArgument(
            "A claim needs at least one visit".into(),
        ));
    }
    let mut deduped = visit_ids.to_vec();
    deduped.sort();
    deduped.dedup();
    if deduped.len() != visit_ids.len() {
        return Err(LedgerError::InvalidArgument(
            "Duplicate visit ids in claim".into(),
        ));
    }

    let day_key = day.format("%Y-%m-%d").to_string();
    let mut visits = Vec::with_capacity(visit_ids.len());
    for visit_id in visit_ids {
        let visit = visit_repo::get_visit(conn, visit_id)?
            .ok_or_else(|| LedgerError::not_found("Visit", visit_id))?;
        if !caller.owns(&visit.social_worker_email, visit.social_worker_uid.as_deref()) {
            return Err(LedgerError::Forbidden(format!(
                "Visit {visit_id} belongs to another worker"
            )));
        }
        if visit.is_frozen() {
            return Err(LedgerError::Conflict(format!(
                "Visit {visit_id} is no longer a draft"
            )));
        }
        if visit.claim_id.is_some() {
            return Err(LedgerError::Conflict(format!(
                "Visit {visit_id} already belongs to a claim"
            )));
        }
        if visit.rcfe_id != rcfe_id {
            return Err(LedgerError::InvalidArgument(format!(
                "Visit {visit_id} is at a different facility"
            )));
        }
        if visit.day_key() != day_key {
            return Err(LedgerError::InvalidArgument(format!(
                "Visit {visit_id} is on a different day"
            )));
        }
        visits.push(visit);
    }

    let now = Utc::now().naive_utc();
    let claim = Claim {
        id: Uuid::new_v4(),
        rcfe_id: rcfe_id.to_string(),
        rcfe_name: visits[0].rcfe_name.clone(),
        rcfe_address: visits[0].rcfe_address.clone(),
        claim_day: day,
        claim_month: claim_month_of(day),
        social_worker_email: caller.email.clone(),
        social_worker_uid: Some(caller.uid.clone()),
        visit_count: visits.len() as i64,
        total_amount: fees::day_amount(visits.len() as i64),
        status: ClaimStatus::Draft,
        review_status: None,
        payment_status: None,
        member_visits: visits.iter().map(VisitSummary::from).collect(),
        created_at: now,
        updated_at: now,
        submitted_at: None,
    };

    let tx = conn.unchecked_transaction().map_err(LedgerError::from)?;
    claim_repo::insert_claim(&tx, &claim)?;
    claim_repo::insert_claim_visits(&tx, &claim.id, visit_ids)?;
    for visit_id in visit_ids {
        visit_repo::set_visit_claim(&tx, visit_id, &claim.id, ClaimStatus::Draft)?;
    }
    event_repo::insert_claim_event(
        &tx,
        &claim.id,
        &now,
        &json!({
            "event": "created",
            "actor": caller.email,
            "visit_count": claim.visit_count,
            "total_amount": claim.total_amount,
        }),
    )?;
    tx.commit().map_err(LedgerError::from)?;

    info!(
        claim_id = %claim.id,
        rcfe_id,
        visit_count = claim.visit_count,
        total_amount = claim.total_amount,
        "draft claim created"
    );
    Ok(claim)
}

/// Submit a draft claim: the claim and every visit in it move to
/// submitted together, stamped with one shared timestamp.
pub fn submit_claim(conn: &Connection, caller: &Caller, claim_id: &Uuid) -> LedgerResult<Claim> {
    let claim = claim_repo::get_claim(conn, claim_id)?
        .ok_or_else(|| LedgerError::not_found("Claim", claim_id))?;
    guard::can_submit_claim(caller, &claim)?;

    let submitted_at = Utc::now().naive_utc();
    let tx = conn.unchecked_transaction().map_err(LedgerError::from)?;

    // Re-read inside the transaction; a racing submit loses here.
    let current = claim_repo::get_claim(&tx, claim_id)?
        .ok_or_else(|| LedgerError::not_found("Claim", claim_id))?;
    guard::can_submit_claim(caller, &current)?;

    let visit_ids = claim_repo::get_claim_visit_ids(&tx, claim_id)?;
    claim_repo::mark_claim_submitted(&tx, claim_id, &submitted_at)?;
    for visit_id in &visit_ids {
        visit_repo::mark_visit_submitted(&tx, visit_id, &submitted_at)?;
    }
    event_repo::insert_claim_event(
        &tx,
        claim_id,
        &submitted_at,
        &json!({
            "event": "submitted",
            "actor": caller.email,
            "visit_count": visit_ids.len(),
        }),
    )?;
    tx.commit().map_err(LedgerError::from)?;

    info!(claim_id = %claim_id, visit_count = visit_ids.len(), "claim submitted");
    claim_repo::get_claim(conn, claim_id)?
        .ok_or_else(|| LedgerError::not_found("Claim", claim_id))
}

/// Delete a draft claim and return its visits to the unclaimed pool.
/// Claim and visit detachment commit together. A claim with any
/// attestation, or with a visit that crossed a trust boundary, is not
/// deletable.
pub fn delete_draft_claim(conn: &Connection, caller: &Caller, claim_id: &Uuid) -> LedgerResult<()> {
    let tx = conn.unchecked_transaction().map_err(LedgerError::from)?;
    let claim = claim_repo::get_claim(&tx, claim_id)?
        .ok_or_else(|| LedgerError::not_found("Claim", claim_id))?;
    let visit_ids = claim_repo::get_claim_visit_ids(&tx, claim_id)?;
    let mut visits = Vec::with_capacity(visit_ids.len());
    for visit_id in &visit_ids {
        if let Some(visit) = visit_repo::get_visit(&tx, visit_id)? {
            visits.push(visit);
        }
    }
    let attestations = signoff_repo::get_signoffs_by_claim(&tx, claim_id)?;
    guard::can_delete_claim(caller, &claim, &visits, !attestations.is_empty())?;

    for visit_id in &visit_ids {
        visit_repo::clear_visit_claim(&tx, visit_id)?;
    }
    claim_repo::delete_claim(&tx, claim_id)?;
    tx.commit().map_err(LedgerError::from)?;

    info!(claim_id = %claim_id, released = visit_ids.len(), "draft claim deleted");
    Ok(())
}

/// Full claim view: claim, ordered visit ids, attestations and audit
/// events. If the member_visits mirror has drifted from the canonical
/// visits it is rebuilt best-effort before returning.
pub fn lookup_claim(conn: &Connection, caller: &Caller, claim_id: &Uuid) -> LedgerResult<ClaimDetail> {
    let mut claim = claim_repo::get_claim(conn, claim_id)?
        .ok_or_else(|| LedgerError::not_found("Claim", claim_id))?;
    guard::can_view(
        caller,
        &claim.social_worker_email,
        claim.social_worker_uid.as_deref(),
    )?;

    let visit_ids = claim_repo::get_claim_visit_ids(conn, claim_id)?;
    let canonical = mirror_of(conn, &visit_ids)?;
    if claim.member_visits != canonical {
        match claim_repo::update_claim_member_visits(
            conn,
            claim_id,
            &canonical,
            &Utc::now().naive_utc(),
        ) {
            Ok(()) => {
                info!(claim_id = %claim_id, "claim mirror reconciled on lookup");
                claim.member_visits = canonical;
            }
            Err(e) => {
                warn!(claim_id = %claim_id, error = %e, "claim mirror reconcile failed");
                claim.member_visits = canonical;
            }
        }
    }

    let signoffs = signoff_repo::get_signoffs_by_claim(conn, claim_id)?;
    let events = event_repo::get_claim_events(conn, claim_id)?;

    Ok(ClaimDetail {
        claim,
        visit_ids,
        signoffs,
        events,
    })
}

/// Rebuild a claim's member_visits mirror from the canonical visit
/// rows. Best-effort maintenance; callers log failures and move on.
pub fn refresh_claim_mirror(conn: &Connection, claim_id: &Uuid) -> LedgerResult<()> {
    let visit_ids = claim_repo::get_claim_visit_ids(conn, claim_id)?;
    let summaries = mirror_of(conn, &visit_ids)?;
    claim_repo::update_claim_member_visits(conn, claim_id, &summaries, &Utc::now().naive_utc())?;
    Ok(())
}

fn mirror_of(conn: &Connection, visit_ids: &[Uuid]) -> LedgerResult<Vec<VisitSummary>> {
    let mut summaries = Vec::with_capacity(visit_ids.len());
    for visit_id in visit_ids {
        if let Some(visit) = visit_repo::get_visit(conn, visit_id)? {
            summaries.push(VisitSummary::from(&visit));
        }
    }
    Ok(summaries)
}
