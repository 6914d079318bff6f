//! Candidate matcher: owner-scoped scans filtered in memory.
//!
//! The store only indexes visits by owner. Facility and day matching,
//! the legacy facility-id shim and member dedup all happen here, on a
//! bounded recency-ordered scan.

use chrono::NaiveDate;
use rusqlite::Connection;
use tracing::debug;

use crate::db::repository::visit as visit_repo;
use crate::error::LedgerResult;
use crate::models::enums::VisitStatus;
use crate::models::identity::Caller;
use crate::models::visit::VisitRecord;

/// Bound on the owner scan. A worker's recent history fits well within
/// this; anything older is not claimable anyway.
const OWNER_SCAN_LIMIT: u32 = 1000;

/// Matched candidates plus facility display fields taken from the
/// first (most recent) match.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CandidateSet {
    /// Most recently updated first, one visit per member.
    pub visits: Vec<VisitRecord>,
    pub rcfe_name: Option<String>,
    pub rcfe_address: Option<String>,
}

impl CandidateSet {
    fn from_visits(visits: Vec<VisitRecord>) -> Self {
        let rcfe_name = visits.first().map(|v| v.rcfe_name.clone());
        let rcfe_address = visits.first().map(|v| v.rcfe_address.clone());
        Self {
            visits,
            rcfe_name,
            rcfe_address,
        }
    }
}

/// Draft visits owned by `caller` at `rcfe_id` on `day` that are not
/// yet attached to any claim, one per member (most recent wins). An
/// empty result is a normal outcome.
pub fn find_draft_candidates(
    conn: &Connection,
    caller: &Caller,
    rcfe_id: &str,
    day: NaiveDate,
) -> LedgerResult<CandidateSet> {
    let visits = matching_visits(conn, caller, rcfe_id, day, |v| v.claim_id.is_none())?;
    debug!(
        rcfe_id,
        day = %day,
        matched = visits.len(),
        "draft candidate scan"
    );
    Ok(CandidateSet::from_visits(visits))
}

/// Visits at `rcfe_id` on `day` eligible for sign-off: same matching
/// as draft candidates, but visits already attached to a claim stay
/// eligible. Signed-off visits are always excluded.
pub fn find_sign_off_candidates(
    conn: &Connection,
    caller: &Caller,
    rcfe_id: &str,
    day: NaiveDate,
) -> LedgerResult<CandidateSet> {
    let visits = matching_visits(conn, caller, rcfe_id, day, |_| true)?;
    debug!(rcfe_id, day = %day, matched = visits.len(), "sign-off candidate scan");
    Ok(CandidateSet::from_visits(visits))
}

/// Shared scan: recency-ordered owner index, then in-memory facility,
/// day and lifecycle filters plus member dedup (first seen wins, and
/// the scan is most-recent-first).
fn matching_visits(
    conn: &Connection,
    caller: &Caller,
    rcfe_id: &str,
    day: NaiveDate,
    extra: impl Fn(&VisitRecord) -> bool,
) -> LedgerResult<Vec<VisitRecord>> {
    let scanned = visit_repo::get_visits_by_owner(conn, &caller.email, OWNER_SCAN_LIMIT)?;
    let day_key = day.format("%Y-%m-%d").to_string();

    let mut seen_members = std::collections::HashSet::new();
    let visits = scanned
        .into_iter()
        .filter(|v| facility_matches(v, rcfe_id))
        .filter(|v| v.day_key() == day_key)
        .filter(|v| v.status == VisitStatus::Draft && !v.signed_off)
        .filter(|v| extra(v))
        .filter(|v| seen_members.insert(member_key(v)))
        .collect();
    Ok(visits)
}

/// Dedup key: the member id, or name+room for records imported without
/// one.
fn member_key(visit: &VisitRecord) -> String {
    if !visit.member_id.is_empty() {
        return visit.member_id.clone();
    }
    format!(
        "{}|{}",
        visit.member_name,
        visit.member_room.as_deref().unwrap_or("")
    )
}

/// Facility match with a shim for legacy records: older importers
/// stored a slug of the facility name as the id, so a miss on the
/// stored id falls back to comparing against the slugified name.
fn facility_matches(visit: &VisitRecord, requested_id: &str) -> bool {
    if visit.rcfe_id == requested_id {
        return true;
    }
    slugify(&visit.rcfe_name) == requested_id || slugify(&visit.rcfe_name) == slugify(requested_id)
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn caller() -> Caller {
        Caller {
            uid: "uid-1".into(),
            email: "sw@example.org".into(),
            is_admin: false,
        }
    }

    fn seed_visit(conn: &Connection, rcfe_id: &str, member_id: &str, day: NaiveDate) -> Uuid {
        let id = Uuid::new_v4();
        let visit = VisitRecord {
            id,
            member_id: member_id.into(),
            member_name: "Pat".into(),
            member_room: None,
            rcfe_id: rcfe_id.into(),
            rcfe_name: "Sunrise Senior Home".into(),
            rcfe_address: "12 Oak St".into(),
            visit_date: day,
            created_at: Default::default(),
            updated_at: Default::default(),
            completed_at: None,
            submitted_at: None,
            social_worker_email: "sw@example.org".into(),
            social_worker_uid: Some("uid-1".into()),
            raw: None,
            total_score: 0.0,
            flagged: false,
            status: VisitStatus::Draft,
            claim_id: None,
            claim_status: None,
            claim_submitted: false,
            claim_paid: false,
            signed_off: false,
        };
        visit_repo::insert_visit(conn, &visit).unwrap();
        id
    }

    fn set_updated_at(conn: &Connection, id: &Uuid, ts: &str) {
        conn.execute(
            "UPDATE visits SET updated_at = ?2 WHERE id = ?1",
            rusqlite::params![id.to_string(), ts],
        )
        .unwrap();
    }

    #[test]
    fn slugify_matches_legacy_ids() {
        assert_eq!(slugify("Sunrise Senior Home"), "sunrise-senior-home");
        assert_eq!(slugify("  St. Mary's  "), "st-mary-s");
    }

    #[test]
    fn draft_candidates_filter_facility_and_day() {
        let conn = open_memory_database().unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        let other_day = NaiveDate::from_ymd_opt(2026, 3, 8).unwrap();
        let wanted = seed_visit(&conn, "rcfe-1", "m-1", day);
        seed_visit(&conn, "rcfe-1", "m-2", other_day);
        seed_visit(&conn, "rcfe-2", "m-3", day);

        let set = find_draft_candidates(&conn, &caller(), "rcfe-1", day).unwrap();
        assert_eq!(set.visits.len(), 1);
        assert_eq!(set.visits[0].id, wanted);
        assert_eq!(set.rcfe_name.as_deref(), Some("Sunrise Senior Home"));
    }

    #[test]
    fn legacy_slug_id_still_matches() {
        let conn = open_memory_database().unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        seed_visit(&conn, "rcfe-1", "m-1", day);

        let set =
            find_draft_candidates(&conn, &caller(), "sunrise-senior-home", day).unwrap();
        assert_eq!(set.visits.len(), 1);
    }

    #[test]
    fn empty_match_is_not_an_error() {
        let conn = open_memory_database().unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        let set = find_draft_candidates(&conn, &caller(), "rcfe-9", day).unwrap();
        assert!(set.visits.is_empty());
        assert!(set.rcfe_name.is_none());
    }

    #[test]
    fn dedup_keeps_most_recently_updated_per_member() {
        let conn = open_memory_database().unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        let older = seed_visit(&conn, "rcfe-1", "m-1", day);
        let newer = seed_visit(&conn, "rcfe-1", "m-1", day);
        set_updated_at(&conn, &older, "2026-03-07 08:00:00");
        set_updated_at(&conn, &newer, "2026-03-07 17:30:00");

        let set = find_draft_candidates(&conn, &caller(), "rcfe-1", day).unwrap();
        assert_eq!(set.visits.len(), 1);
        assert_eq!(set.visits[0].id, newer);
    }

    #[test]
    fn dedup_falls_back_to_name_and_room() {
        let conn = open_memory_database().unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        // Same empty member id, same name, no room: one candidate.
        seed_visit(&conn, "rcfe-1", "", day);
        seed_visit(&conn, "rcfe-1", "", day);

        let set = find_draft_candidates(&conn, &caller(), "rcfe-1", day).unwrap();
        assert_eq!(set.visits.len(), 1);
    }

    #[test]
    fn claimed_visits_stay_eligible_for_sign_off_only() {
        let conn = open_memory_database().unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        let id = seed_visit(&conn, "rcfe-1", "m-1", day);
        conn.execute(
            "UPDATE visits SET claim_id = ?2, claim_status = 'draft' WHERE id = ?1",
            rusqlite::params![id.to_string(), Uuid::new_v4().to_string()],
        )
        .unwrap();

        let drafts = find_draft_candidates(&conn, &caller(), "rcfe-1", day).unwrap();
        assert!(drafts.visits.is_empty());

        let sign_off = find_sign_off_candidates(&conn, &caller(), "rcfe-1", day).unwrap();
        assert_eq!(sign_off.visits.len(), 1);
    }

    #[test]
    fn signed_off_visits_are_excluded_everywhere() {
        let conn = open_memory_database().unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        let id = seed_visit(&conn, "rcfe-1", "m-1", day);
        conn.execute(
            "UPDATE visits SET signed_off = 1 WHERE id = ?1",
            rusqlite::params![id.to_string()],
        )
        .unwrap();

        let drafts = find_draft_candidates(&conn, &caller(), "rcfe-1", day).unwrap();
        assert!(drafts.visits.is_empty());
        let sign_off = find_sign_off_candidates(&conn, &caller(), "rcfe-1", day).unwrap();
        assert!(sign_off.visits.is_empty());
    }
}
