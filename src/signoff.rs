//! Sign-off processor: facility attestations over submitted visits.
//!
//! Attestations are append-only and the signed_off bit is one-way.
//! Re-signing an already signed visit is not an error; the visit is
//! skipped and reported back so the signing surface can say so.

use chrono::Utc;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::repository::claim_event as event_repo;
use crate::db::repository::signoff as signoff_repo;
use crate::db::repository::visit as visit_repo;
use crate::error::{LedgerError, LedgerResult};
use crate::models::claim::{SignOffAttestation, StoredSignOff};
use crate::models::identity::Caller;

/// Outcome of one sign-off batch.
#[derive(Debug, Clone, Serialize)]
pub struct SignOffSummary {
    /// Visit ids newly frozen by this attestation.
    pub signed: Vec<Uuid>,
    /// Visits that were already signed off and were left untouched.
    pub skipped_already_signed: Vec<Uuid>,
    /// How many of the signed visits carry assessment flags.
    pub flagged: usize,
    pub flagged_visit_ids: Vec<Uuid>,
    /// Whether the attestation carried a capture location.
    pub location_verified: bool,
}

/// Record a facility staff attestation over a batch of visits.
pub fn record_sign_off(
    conn: &Connection,
    caller: &Caller,
    rcfe_id: &str,
    visit_ids: &[Uuid],
    attestation: SignOffAttestation,
) -> LedgerResult<SignOffSummary> {
    if visit_ids.is_empty() {
        return Err(LedgerError::InvalidArgument(
            "No visits to sign off".into(),
        ));
    }
    if attestation.rcfe_staff_name.trim().is_empty() {
        return Err(LedgerError::InvalidArgument(
            "Staff name is required".into(),
        ));
    }
    if attestation.signature_blob.trim().is_empty() {
        return Err(LedgerError::InvalidArgument(
            "Signature is required".into(),
        ));
    }

    let mut to_sign = Vec::new();
    let mut skipped = Vec::new();
    for visit_id in visit_ids {
        let visit = visit_repo::get_visit(conn, visit_id)?
            .ok_or_else(|| LedgerError::not_found("Visit", visit_id))?;
        if !caller.owns(&visit.social_worker_email, visit.social_worker_uid.as_deref()) {
            return Err(LedgerError::Forbidden(format!(
                "Visit {visit_id} belongs to another worker"
            )));
        }
        if visit.signed_off {
            skipped.push(visit.id);
        } else {
            to_sign.push(visit);
        }
    }
    if to_sign.is_empty() {
        return Err(LedgerError::Conflict(
            "Every visit in the batch is already signed off".into(),
        ));
    }

    let signed_at = attestation.signed_at.unwrap_or_else(|| Utc::now().naive_utc());
    let location_verified = attestation.geolocation.is_some();

    // One attestation row per claim touched by the batch.
    let mut claim_ids: Vec<Option<Uuid>> = to_sign.iter().map(|v| v.claim_id).collect();
    claim_ids.sort();
    claim_ids.dedup();

    let tx = conn.unchecked_transaction().map_err(LedgerError::from)?;
    for visit in &to_sign {
        // Re-read inside the transaction; a concurrent attestation on
        // the same visit loses here and is skipped.
        let current = visit_repo::get_visit(&tx, &visit.id)?
            .ok_or_else(|| LedgerError::not_found("Visit", visit.id))?;
        if current.signed_off {
            continue;
        }
        visit_repo::mark_visit_signed_off(&tx, &visit.id)?;
    }
    for claim_id in &claim_ids {
        signoff_repo::insert_signoff(
            &tx,
            &StoredSignOff {
                id: Uuid::new_v4(),
                claim_id: *claim_id,
                rcfe_id: rcfe_id.to_string(),
                staff_name: attestation.rcfe_staff_name.clone(),
                staff_title: attestation.rcfe_staff_title.clone(),
                signature: attestation.signature_blob.clone(),
                signed_at,
                geolocation: attestation.geolocation,
            },
        )?;
        if let Some(claim_id) = claim_id {
            event_repo::insert_claim_event(
                &tx,
                claim_id,
                &signed_at,
                &json!({
                    "event": "signed_off",
                    "staff_name": attestation.rcfe_staff_name,
                    "location_verified": location_verified,
                }),
            )?;
        }
    }
    tx.commit().map_err(LedgerError::from)?;

    let flagged_visit_ids: Vec<Uuid> = to_sign.iter().filter(|v| v.flagged).map(|v| v.id).collect();
    if !flagged_visit_ids.is_empty() {
        warn!(
            rcfe_id,
            flagged = flagged_visit_ids.len(),
            "sign-off batch includes flagged visits"
        );
    }
    info!(
        rcfe_id,
        signed = to_sign.len(),
        skipped = skipped.len(),
        location_verified,
        "sign-off recorded"
    );

    Ok(SignOffSummary {
        signed: to_sign.iter().map(|v| v.id).collect(),
        skipped_already_signed: skipped,
        flagged: flagged_visit_ids.len(),
        flagged_visit_ids,
        location_verified,
    })
}
