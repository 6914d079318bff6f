use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{ClaimStatus, VisitStatus};

/// Canonical record of one field-worker visit to one member at one
/// facility on one day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitRecord {
    pub id: Uuid,
    pub member_id: String,
    pub member_name: String,
    pub member_room: Option<String>,
    pub rcfe_id: String,
    pub rcfe_name: String,
    pub rcfe_address: String,
    /// Calendar day of the visit. Immutable after creation.
    pub visit_date: NaiveDate,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
    pub submitted_at: Option<NaiveDateTime>,
    pub social_worker_email: String,
    pub social_worker_uid: Option<String>,
    /// Opaque visit-assessment payload.
    pub raw: Option<serde_json::Value>,
    pub total_score: f64,
    /// Derived from the assessment payload at creation; never caller-set.
    pub flagged: bool,
    pub status: VisitStatus,
    pub claim_id: Option<Uuid>,
    /// Denormalized mirror of the parent claim's status.
    pub claim_status: Option<ClaimStatus>,
    pub claim_submitted: bool,
    pub claim_paid: bool,
    /// One-way flag: once true the visit is permanently frozen.
    pub signed_off: bool,
}

impl VisitRecord {
    /// Day key used for candidate matching and fee grouping:
    /// the visit date, falling back to the completion date.
    pub fn day_key(&self) -> String {
        self.visit_date.format("%Y-%m-%d").to_string()
    }

    /// Whether any lifecycle gate has permanently frozen this visit.
    pub fn is_frozen(&self) -> bool {
        self.signed_off
            || self.claim_submitted
            || self.claim_paid
            || self.status != VisitStatus::Draft
    }
}

/// Input for creating a new draft visit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitDraft {
    /// Caller-generated id, or None to have the ledger assign one.
    pub id: Option<Uuid>,
    pub member_id: String,
    pub member_name: String,
    pub member_room: Option<String>,
    pub rcfe_id: String,
    pub rcfe_name: String,
    #[serde(default)]
    pub rcfe_address: String,
    pub visit_date: NaiveDate,
    pub completed_at: Option<NaiveDateTime>,
    pub raw: Option<serde_json::Value>,
    #[serde(default)]
    pub total_score: f64,
}

/// Partial update to a draft visit. Absent fields are left unchanged.
///
/// `visit_date`, `member_id` and `rcfe_id` may be echoed back but must
/// match the stored values; the Lifecycle Guard rejects any change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VisitPatch {
    pub member_name: Option<String>,
    pub member_room: Option<String>,
    pub rcfe_name: Option<String>,
    pub rcfe_address: Option<String>,
    pub raw: Option<serde_json::Value>,
    pub total_score: Option<f64>,
    pub completed_at: Option<NaiveDateTime>,
    pub visit_date: Option<NaiveDate>,
    pub member_id: Option<String>,
    pub rcfe_id: Option<String>,
}

/// Denormalized visit summary embedded in a claim's member_visits
/// mirror. Display convenience only; visits stay canonical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitSummary {
    pub visit_id: Uuid,
    pub member_id: String,
    pub member_name: String,
    pub member_room: Option<String>,
    pub rcfe_name: String,
    pub rcfe_address: String,
    pub visit_date: NaiveDate,
    pub flagged: bool,
}

impl From<&VisitRecord> for VisitSummary {
    fn from(v: &VisitRecord) -> Self {
        Self {
            visit_id: v.id,
            member_id: v.member_id.clone(),
            member_name: v.member_name.clone(),
            member_room: v.member_room.clone(),
            rcfe_name: v.rcfe_name.clone(),
            rcfe_address: v.rcfe_address.clone(),
            visit_date: v.visit_date,
            flagged: v.flagged,
        }
    }
}
