//! Lifecycle Guard: pure decision functions over in-memory records.
//!
//! No storage access happens here. Services load the current record,
//! ask the guard, and only then touch the store. Submission paths call
//! the guard a second time inside the write transaction so a racing
//! freeze loses cleanly.

use crate::error::{LedgerError, LedgerResult};
use crate::models::claim::Claim;
use crate::models::enums::ClaimStatus;
use crate::models::identity::Caller;
use crate::models::visit::{VisitPatch, VisitRecord};

/// Decide whether `caller` may apply `patch` to `visit`.
///
/// Rejects, in order: non-owners, any frozen visit, and patches that
/// try to move the visit's identity (member, facility or date).
pub fn can_edit_visit(
    caller: &Caller,
    visit: &VisitRecord,
    patch: &VisitPatch,
) -> LedgerResult<()> {
    if !caller.owns(&visit.social_worker_email, visit.social_worker_uid.as_deref()) {
        return Err(LedgerError::Forbidden(
            "Visit belongs to another worker".into(),
        ));
    }
    if visit.signed_off {
        return Err(LedgerError::Conflict(
            "Visit has been signed off and is permanently frozen".into(),
        ));
    }
    if visit.claim_submitted || visit.claim_paid {
        return Err(LedgerError::Conflict(format!(
            "Visit belongs to a {} claim and can no longer be edited",
            if visit.claim_paid { "paid" } else { "submitted" }
        )));
    }
    if visit.status != crate::models::enums::VisitStatus::Draft {
        return Err(LedgerError::Conflict(format!(
            "Visit is {} and can no longer be edited",
            visit.status.as_str()
        )));
    }

    // Identity fields may be echoed back unchanged, never moved.
    if patch.visit_date.is_some_and(|d| d != visit.visit_date) {
        return Err(LedgerError::Conflict(
            "visit_date is immutable after creation".into(),
        ));
    }
    if patch.member_id.as_deref().is_some_and(|m| m != visit.member_id) {
        return Err(LedgerError::InvalidArgument(
            "member_id is immutable after creation".into(),
        ));
    }
    if patch.rcfe_id.as_deref().is_some_and(|r| r != visit.rcfe_id) {
        return Err(LedgerError::InvalidArgument(
            "rcfe_id is immutable after creation".into(),
        ));
    }
    Ok(())
}

/// Decide whether `caller` may delete `claim` together with its
/// referenced `visits`.
///
/// Draft claims only, owner only, and never once any attestation
/// exists or any referenced visit has crossed a trust boundary.
pub fn can_delete_claim(
    caller: &Caller,
    claim: &Claim,
    visits: &[VisitRecord],
    has_attestations: bool,
) -> LedgerResult<()> {
    if !caller.owns(&claim.social_worker_email, claim.social_worker_uid.as_deref()) {
        return Err(LedgerError::Forbidden(
            "Claim belongs to another worker".into(),
        ));
    }
    if claim.status != ClaimStatus::Draft {
        return Err(LedgerError::Conflict(format!(
            "Claim is {} and can no longer be deleted",
            claim.status.as_str()
        )));
    }
    if has_attestations {
        return Err(LedgerError::Conflict(
            "Claim has facility attestations and can no longer be deleted".into(),
        ));
    }
    for visit in visits {
        if visit.signed_off {
            return Err(LedgerError::Conflict(format!(
                "Visit {} has been signed off",
                visit.id
            )));
        }
        if visit.claim_submitted || visit.claim_paid || visit.status != crate::models::enums::VisitStatus::Draft {
            return Err(LedgerError::Conflict(format!(
                "Visit {} is no longer a draft",
                visit.id
            )));
        }
        if visit.claim_id != Some(claim.id) {
            return Err(LedgerError::Conflict(format!(
                "Visit {} belongs to a different claim",
                visit.id
            )));
        }
    }
    Ok(())
}

/// Decide whether `caller` may submit `claim`. The claim must be a
/// draft owned by the caller with at least one visit.
pub fn can_submit_claim(caller: &Caller, claim: &Claim) -> LedgerResult<()> {
    if !caller.owns(&claim.social_worker_email, claim.social_worker_uid.as_deref()) {
        return Err(LedgerError::Forbidden(
            "Claim belongs to another worker".into(),
        ));
    }
    if claim.status != ClaimStatus::Draft {
        return Err(LedgerError::Conflict(format!(
            "Claim is already {}",
            claim.status.as_str()
        )));
    }
    if claim.visit_count == 0 {
        return Err(LedgerError::InvalidArgument(
            "Claim has no visits to submit".into(),
        ));
    }
    Ok(())
}

/// Read access check: owner or admin. Admins read everything but never
/// bypass mutation guards.
pub fn can_view(caller: &Caller, owner_email: &str, owner_uid: Option<&str>) -> LedgerResult<()> {
    if caller.is_admin || caller.owns(owner_email, owner_uid) {
        return Ok(());
    }
    Err(LedgerError::Forbidden(
        "Record belongs to another worker".into(),
    ))
}
