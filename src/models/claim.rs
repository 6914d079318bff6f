use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::ClaimStatus;
use super::visit::VisitSummary;

/// A payable batch grouping one or more visits by facility and day
/// for a single worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    pub id: Uuid,
    pub rcfe_id: String,
    pub rcfe_name: String,
    pub rcfe_address: String,
    pub claim_day: NaiveDate,
    /// YYYY-MM, derived from claim_day.
    pub claim_month: String,
    pub social_worker_email: String,
    pub social_worker_uid: Option<String>,
    pub visit_count: i64,
    /// Derived via the fee calculator; not independently authoritative.
    pub total_amount: i64,
    pub status: ClaimStatus,
    pub review_status: Option<String>,
    pub payment_status: Option<String>,
    /// Denormalized visit summaries, mirroring the canonical records
    /// referenced by visit_ids. Best-effort display cache.
    pub member_visits: Vec<VisitSummary>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub submitted_at: Option<NaiveDateTime>,
}

/// Facility representative's attestation that a batch of visits
/// occurred. Write-once: a repeat sign-off is a new row, never an edit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignOffAttestation {
    pub rcfe_staff_name: String,
    pub rcfe_staff_title: Option<String>,
    /// Encoded signature image, as captured by the signing surface.
    pub signature_blob: String,
    pub signed_at: Option<NaiveDateTime>,
    pub geolocation: Option<Geolocation>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Geolocation {
    pub lat: f64,
    pub lng: f64,
}

/// A stored attestation row (append-only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSignOff {
    pub id: Uuid,
    pub claim_id: Option<Uuid>,
    pub rcfe_id: String,
    pub staff_name: String,
    pub staff_title: Option<String>,
    pub signature: String,
    pub signed_at: NaiveDateTime,
    pub geolocation: Option<Geolocation>,
}

/// One append-only audit event in a claim's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimEvent {
    pub claim_id: Uuid,
    pub created_at: NaiveDateTime,
    pub payload: serde_json::Value,
}

/// Full claim view returned by lookup: the claim plus its composition
/// and audit trail, so a caller can explain the claim's life without
/// extra round-trips.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimDetail {
    pub claim: Claim,
    pub visit_ids: Vec<Uuid>,
    pub signoffs: Vec<StoredSignOff>,
    /// Newest first.
    pub events: Vec<ClaimEvent>,
}

/// Derive the YYYY-MM claim month from a claim day.
pub fn claim_month_of(day: NaiveDate) -> String {
    day.format("%Y-%m").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_month_derivation() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        assert_eq!(claim_month_of(day), "2026-03");
    }
}
