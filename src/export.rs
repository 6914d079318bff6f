//! Monthly export: a worker's submitted visits for one calendar month,
//! annotated with per-day fee aggregates.

use chrono::{Datelike, NaiveDate};
use rusqlite::Connection;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::db::repository::visit as visit_repo;
use crate::error::{LedgerError, LedgerResult};
use crate::fees;
use crate::models::identity::Caller;
use crate::models::visit::VisitRecord;

/// One exported visit with its day's aggregate alongside.
#[derive(Debug, Clone, Serialize)]
pub struct ExportRow {
    pub visit_id: Uuid,
    pub visit_date: NaiveDate,
    pub member_id: String,
    pub member_name: String,
    pub rcfe_id: String,
    pub rcfe_name: String,
    pub claim_id: Option<Uuid>,
    pub flagged: bool,
    /// Visits the owner submitted on this day (across claims).
    pub day_visit_count: i64,
    /// Payable amount for the day: count * visit fee + one gas.
    pub day_amount: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyExport {
    /// YYYY-MM.
    pub month: String,
    pub rows: Vec<ExportRow>,
    pub total_visits: i64,
    /// Sum of per-day amounts; gas counted once per day.
    pub total_amount: i64,
}

/// Export `caller`'s submitted visits for `month` (YYYY-MM).
///
/// The scan covers submitted_at in [month start, next month start);
/// ownership filtering happens in memory. Admins may export on behalf
/// of another worker by passing that worker's email.
pub fn export_monthly_visits(
    conn: &Connection,
    caller: &Caller,
    month: &str,
    owner_email: Option<&str>,
) -> LedgerResult<MonthlyExport> {
    let owner = match owner_email {
        Some(email) if !email.eq_ignore_ascii_case(&caller.email) => {
            if !caller.is_admin {
                return Err(LedgerError::Forbidden(
                    "Only admins may export for another worker".into(),
                ));
            }
            email
        }
        _ => caller.email.as_str(),
    };

    let start = NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d")
        .map_err(|_| LedgerError::InvalidArgument(format!("Invalid month: {month}")))?;
    let end = next_month(start);
    let start_ts = start.and_hms_opt(0, 0, 0).unwrap_or_default();
    let end_ts = end.and_hms_opt(0, 0, 0).unwrap_or_default();

    let scanned = visit_repo::get_visits_submitted_between(conn, &start_ts, &end_ts)?;
    let visits: Vec<VisitRecord> = scanned
        .into_iter()
        .filter(|v| v.social_worker_email.eq_ignore_ascii_case(owner))
        .collect();

    let day_totals = fees::day_totals(&visits);
    let total_visits = visits.len() as i64;
    let total_amount = day_totals.values().map(|(_, amount)| amount).sum();

    let rows = visits
        .iter()
        .map(|v| {
            let (day_visit_count, day_amount) =
                day_totals.get(&v.day_key()).copied().unwrap_or((0, 0));
            ExportRow {
                visit_id: v.id,
                visit_date: v.visit_date,
                member_id: v.member_id.clone(),
                member_name: v.member_name.clone(),
                rcfe_id: v.rcfe_id.clone(),
                rcfe_name: v.rcfe_name.clone(),
                claim_id: v.claim_id,
                flagged: v.flagged,
                day_visit_count,
                day_amount,
            }
        })
        .collect();

    info!(month, owner, total_visits, total_amount, "monthly export");
    Ok(MonthlyExport {
        month: month.to_string(),
        rows,
        total_visits,
        total_amount,
    })
}

fn next_month(start: NaiveDate) -> NaiveDate {
    let (year, month) = if start.month() == 12 {
        (start.year() + 1, 1)
    } else {
        (start.year(), start.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims;
    use crate::db::sqlite::open_memory_database;
    use crate::models::visit::VisitDraft;
    use crate::visits;

    fn caller() -> Caller {
        Caller {
            uid: "uid-1".into(),
            email: "sw@example.org".into(),
            is_admin: false,
        }
    }

    fn submit_day(conn: &Connection, day: NaiveDate, members: &[&str]) {
        let mut ids = Vec::new();
        for member in members {
            let draft = VisitDraft {
                id: None,
                member_id: (*member).into(),
                member_name: format!("Member {member}"),
                member_room: None,
                rcfe_id: "rcfe-1".into(),
                rcfe_name: "Sunrise Home".into(),
                rcfe_address: "12 Oak St".into(),
                visit_date: day,
                completed_at: None,
                raw: None,
                total_score: 0.0,
            };
            ids.push(visits::create_draft_visit(conn, &caller(), draft).unwrap().id);
        }
        let claim =
            claims::create_claim_from_visits(conn, &caller(), "rcfe-1", day, &ids).unwrap();
        claims::submit_claim(conn, &caller(), &claim.id).unwrap();
        // Backdate the submission stamp into the visit's own month so
        // the export range scan picks it up.
        conn.execute(
            "UPDATE visits SET submitted_at = ?2 WHERE visit_date = ?1",
            rusqlite::params![day.to_string(), format!("{day} 10:00:00")],
        )
        .unwrap();
    }

    #[test]
    fn month_rollover() {
        let dec = NaiveDate::from_ymd_opt(2026, 12, 1).unwrap();
        assert_eq!(next_month(dec), NaiveDate::from_ymd_opt(2027, 1, 1).unwrap());
        let mar = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert_eq!(next_month(mar), NaiveDate::from_ymd_opt(2026, 4, 1).unwrap());
    }

    #[test]
    fn export_aggregates_per_day() {
        let conn = open_memory_database().unwrap();
        submit_day(&conn, NaiveDate::from_ymd_opt(2026, 3, 7).unwrap(), &["m-1", "m-2", "m-3"]);
        submit_day(&conn, NaiveDate::from_ymd_opt(2026, 3, 8).unwrap(), &["m-4"]);

        let export = export_monthly_visits(&conn, &caller(), "2026-03", None).unwrap();
        assert_eq!(export.total_visits, 4);
        // 3*45+20 on the 7th, 1*45+20 on the 8th
        assert_eq!(export.total_amount, 155 + 65);

        let row = export
            .rows
            .iter()
            .find(|r| r.member_id == "m-1")
            .unwrap();
        assert_eq!(row.day_visit_count, 3);
        assert_eq!(row.day_amount, 155);
    }

    #[test]
    fn drafts_are_not_exported() {
        let conn = open_memory_database().unwrap();
        let draft = VisitDraft {
            id: None,
            member_id: "m-1".into(),
            member_name: "Pat".into(),
            member_room: None,
            rcfe_id: "rcfe-1".into(),
            rcfe_name: "Sunrise Home".into(),
            rcfe_address: "12 Oak St".into(),
            visit_date: NaiveDate::from_ymd_opt(2026, 3, 7).unwrap(),
            completed_at: None,
            raw: None,
            total_score: 0.0,
        };
        visits::create_draft_visit(&conn, &caller(), draft).unwrap();

        let export = export_monthly_visits(&conn, &caller(), "2026-03", None).unwrap();
        assert!(export.rows.is_empty());
        assert_eq!(export.total_amount, 0);
    }

    #[test]
    fn export_scoped_to_owner() {
        let conn = open_memory_database().unwrap();
        submit_day(&conn, NaiveDate::from_ymd_opt(2026, 3, 7).unwrap(), &["m-1"]);

        let stranger = Caller {
            uid: "u9".into(),
            email: "other@example.org".into(),
            is_admin: false,
        };
        let export = export_monthly_visits(&conn, &stranger, "2026-03", None).unwrap();
        assert!(export.rows.is_empty());

        let err = export_monthly_visits(&conn, &stranger, "2026-03", Some("sw@example.org"))
            .unwrap_err();
        assert_eq!(err.kind(), "forbidden");

        let admin = Caller {
            uid: "a1".into(),
            email: "admin@example.org".into(),
            is_admin: true,
        };
        let export =
            export_monthly_visits(&conn, &admin, "2026-03", Some("sw@example.org")).unwrap();
        assert_eq!(export.total_visits, 1);
    }

    #[test]
    fn malformed_month_is_invalid() {
        let conn = open_memory_database().unwrap();
        let err = export_monthly_visits(&conn, &caller(), "March 2026", None).unwrap_err();
        assert_eq!(err.kind(), "invalid_argument");
    }
}
