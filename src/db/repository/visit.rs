use std::str::FromStr;

use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{parse_date, parse_ts, ts_string};
use crate::db::DatabaseError;
use crate::models::enums::{ClaimStatus, VisitStatus};
use crate::models::visit::VisitRecord;

const VISIT_COLUMNS: &str = "id, member_id, member_name, member_room, rcfe_id, rcfe_name, \
     rcfe_address, visit_date, created_at, updated_at, completed_at, submitted_at, \
     social_worker_email, social_worker_uid, raw, total_score, flagged, status, \
     claim_id, claim_status, claim_submitted, claim_paid, signed_off";

pub fn insert_visit(conn: &Connection, visit: &VisitRecord) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO visits (id, member_id, member_name, member_room, rcfe_id, rcfe_name,
         rcfe_address, visit_date, created_at, updated_at, completed_at, submitted_at,
         social_worker_email, social_worker_uid, raw, total_score, flagged, status,
         claim_id, claim_status, claim_submitted, claim_paid, signed_off)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                 ?17, ?18, ?19, ?20, ?21, ?22, ?23)",
        params![
            visit.id.to_string(),
            visit.member_id,
            visit.member_name,
            visit.member_room,
            visit.rcfe_id,
            visit.rcfe_name,
            visit.rcfe_address,
            visit.visit_date.to_string(),
            ts_string(&visit.created_at),
            ts_string(&visit.updated_at),
            visit.completed_at.as_ref().map(ts_string),
            visit.submitted_at.as_ref().map(ts_string),
            visit.social_worker_email,
            visit.social_worker_uid,
            visit.raw.as_ref().map(|v| v.to_string()),
            visit.total_score,
            visit.flagged as i32,
            visit.status.as_str(),
            visit.claim_id.map(|id| id.to_string()),
            visit.claim_status.map(|s| s.as_str()),
            visit.claim_submitted as i32,
            visit.claim_paid as i32,
            visit.signed_off as i32,
        ],
    )?;
    Ok(())
}

pub fn get_visit(conn: &Connection, id: &Uuid) -> Result<Option<VisitRecord>, DatabaseError> {
    let sql = format!("SELECT {VISIT_COLUMNS} FROM visits WHERE id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let result = stmt.query_row(params![id.to_string()], visit_row);

    match result {
        Ok(row) => Ok(Some(visit_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Persist the mutable fields of a visit (draft-window edits).
///
/// Identity, location ids and visit_date are never updated here; the
/// Lifecycle Guard rejects attempts to change them before this runs.
pub fn update_visit(conn: &Connection, visit: &VisitRecord) -> Result<(), DatabaseError> {
    let rows = conn.execute(
        "UPDATE visits SET member_name = ?2, member_room = ?3, rcfe_name = ?4,
         rcfe_address = ?5, updated_at = ?6, completed_at = ?7, raw = ?8,
         total_score = ?9, flagged = ?10
         WHERE id = ?1",
        params![
            visit.id.to_string(),
            visit.member_name,
            visit.member_room,
            visit.rcfe_name,
            visit.rcfe_address,
            ts_string(&visit.updated_at),
            visit.completed_at.as_ref().map(ts_string),
            visit.raw.as_ref().map(|v| v.to_string()),
            visit.total_score,
            visit.flagged as i32,
        ],
    )?;
    if rows == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Visit".into(),
            id: visit.id.to_string(),
        });
    }
    Ok(())
}

/// Attach a visit to a claim (draft window only).
pub fn set_visit_claim(
    conn: &Connection,
    visit_id: &Uuid,
    claim_id: &Uuid,
    claim_status: ClaimStatus,
) -> Result<(), DatabaseError> {
    let rows = conn.execute(
        "UPDATE visits SET claim_id = ?2, claim_status = ?3 WHERE id = ?1",
        params![
            visit_id.to_string(),
            claim_id.to_string(),
            claim_status.as_str()
        ],
    )?;
    if rows == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Visit".into(),
            id: visit_id.to_string(),
        });
    }
    Ok(())
}

/// Detach a visit from a deleted draft claim, returning it to the
/// unclaimed pool.
pub fn clear_visit_claim(conn: &Connection, visit_id: &Uuid) -> Result<(), DatabaseError> {
    let rows = conn.execute(
        "UPDATE visits SET claim_id = NULL, claim_status = NULL WHERE id = ?1",
        params![visit_id.to_string()],
    )?;
    if rows == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Visit".into(),
            id: visit_id.to_string(),
        });
    }
    Ok(())
}

/// Transition a visit to submitted as part of a claim submission batch.
pub fn mark_visit_submitted(
    conn: &Connection,
    visit_id: &Uuid,
    submitted_at: &chrono::NaiveDateTime,
) -> Result<(), DatabaseError> {
    let rows = conn.execute(
        "UPDATE visits SET status = 'submitted', claim_status = 'submitted',
         claim_submitted = 1, submitted_at = ?2, updated_at = ?2
         WHERE id = ?1",
        params![visit_id.to_string(), ts_string(submitted_at)],
    )?;
    if rows == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Visit".into(),
            id: visit_id.to_string(),
        });
    }
    Ok(())
}

/// One-way sign-off flag. Never cleared.
pub fn mark_visit_signed_off(conn: &Connection, visit_id: &Uuid) -> Result<(), DatabaseError> {
    let rows = conn.execute(
        "UPDATE visits SET signed_off = 1 WHERE id = ?1",
        params![visit_id.to_string()],
    )?;
    if rows == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Visit".into(),
            id: visit_id.to_string(),
        });
    }
    Ok(())
}

pub fn delete_visit(conn: &Connection, visit_id: &Uuid) -> Result<(), DatabaseError> {
    let rows = conn.execute(
        "DELETE FROM visits WHERE id = ?1",
        params![visit_id.to_string()],
    )?;
    if rows == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Visit".into(),
            id: visit_id.to_string(),
        });
    }
    Ok(())
}

/// Owner-scoped scan, most recently updated first, bounded by `limit`.
///
/// Candidate matching filters the result in memory rather than asking
/// the store for a composite owner+facility+day index.
pub fn get_visits_by_owner(
    conn: &Connection,
    owner_email: &str,
    limit: u32,
) -> Result<Vec<VisitRecord>, DatabaseError> {
    let sql = format!(
        "SELECT {VISIT_COLUMNS} FROM visits
         WHERE social_worker_email = ?1 COLLATE NOCASE
         ORDER BY updated_at DESC LIMIT ?2"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![owner_email, limit], visit_row)?;

    let mut visits = Vec::new();
    for row in rows {
        visits.push(visit_from_row(row?)?);
    }
    Ok(visits)
}

/// Range scan over the submission-timestamp index: submitted_at in
/// [start, end). Owner filtering happens in memory at the export layer.
pub fn get_visits_submitted_between(
    conn: &Connection,
    start: &chrono::NaiveDateTime,
    end: &chrono::NaiveDateTime,
) -> Result<Vec<VisitRecord>, DatabaseError> {
    let sql = format!(
        "SELECT {VISIT_COLUMNS} FROM visits
         WHERE submitted_at >= ?1 AND submitted_at < ?2
         ORDER BY submitted_at ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![ts_string(start), ts_string(end)], visit_row)?;

    let mut visits = Vec::new();
    for row in rows {
        visits.push(visit_from_row(row?)?);
    }
    Ok(visits)
}

pub fn get_visits_by_claim(
    conn: &Connection,
    claim_id: &Uuid,
) -> Result<Vec<VisitRecord>, DatabaseError> {
    let sql = format!(
        "SELECT {VISIT_COLUMNS} FROM visits WHERE claim_id = ?1 ORDER BY created_at ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![claim_id.to_string()], visit_row)?;

    let mut visits = Vec::new();
    for row in rows {
        visits.push(visit_from_row(row?)?);
    }
    Ok(visits)
}

// Internal row type for Visit mapping
struct VisitRow {
    id: String,
    member_id: String,
    member_name: String,
    member_room: Option<String>,
    rcfe_id: String,
    rcfe_name: String,
    rcfe_address: String,
    visit_date: String,
    created_at: String,
    updated_at: String,
    completed_at: Option<String>,
    submitted_at: Option<String>,
    social_worker_email: String,
    social_worker_uid: Option<String>,
    raw: Option<String>,
    total_score: f64,
    flagged: i32,
    status: String,
    claim_id: Option<String>,
    claim_status: Option<String>,
    claim_submitted: i32,
    claim_paid: i32,
    signed_off: i32,
}

fn visit_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<VisitRow> {
    Ok(VisitRow {
        id: row.get(0)?,
        member_id: row.get(1)?,
        member_name: row.get(2)?,
        member_room: row.get(3)?,
        rcfe_id: row.get(4)?,
        rcfe_name: row.get(5)?,
        rcfe_address: row.get(6)?,
        visit_date: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
        completed_at: row.get(10)?,
        submitted_at: row.get(11)?,
        social_worker_email: row.get(12)?,
        social_worker_uid: row.get(13)?,
        raw: row.get(14)?,
        total_score: row.get(15)?,
        flagged: row.get(16)?,
        status: row.get(17)?,
        claim_id: row.get(18)?,
        claim_status: row.get(19)?,
        claim_submitted: row.get(20)?,
        claim_paid: row.get(21)?,
        signed_off: row.get(22)?,
    })
}

fn visit_from_row(row: VisitRow) -> Result<VisitRecord, DatabaseError> {
    Ok(VisitRecord {
        id: Uuid::parse_str(&row.id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        member_id: row.member_id,
        member_name: row.member_name,
        member_room: row.member_room,
        rcfe_id: row.rcfe_id,
        rcfe_name: row.rcfe_name,
        rcfe_address: row.rcfe_address,
        visit_date: parse_date(&row.visit_date)?,
        created_at: parse_ts(&row.created_at)?,
        updated_at: parse_ts(&row.updated_at)?,
        completed_at: row.completed_at.as_deref().map(parse_ts).transpose()?,
        submitted_at: row.submitted_at.as_deref().map(parse_ts).transpose()?,
        social_worker_email: row.social_worker_email,
        social_worker_uid: row.social_worker_uid,
        raw: row.raw.and_then(|s| serde_json::from_str(&s).ok()),
        total_score: row.total_score,
        flagged: row.flagged != 0,
        status: VisitStatus::from_str(&row.status)?,
        claim_id: row.claim_id.and_then(|s| Uuid::parse_str(&s).ok()),
        claim_status: row
            .claim_status
            .as_deref()
            .and_then(|s| ClaimStatus::from_str(s).ok()),
        claim_submitted: row.claim_submitted != 0,
        claim_paid: row.claim_paid != 0,
        signed_off: row.signed_off != 0,
    })
}
