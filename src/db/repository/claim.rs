use std::str::FromStr;

use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{parse_date, parse_ts, ts_string};
use crate::db::DatabaseError;
use crate::models::claim::Claim;
use crate::models::enums::ClaimStatus;
use crate::models::visit::VisitSummary;

const CLAIM_COLUMNS: &str = "id, rcfe_id, rcfe_name, rcfe_address, claim_day, claim_month, \
     social_worker_email, social_worker_uid, visit_count, total_amount, status, \
     review_status, payment_status, member_visits, created_at, updated_at, submitted_at";

pub fn insert_claim(conn: &Connection, claim: &Claim) -> Result<(), DatabaseError> {
    let member_visits = serde_json::to_string(&claim.member_visits)
        .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?;
    conn.execute(
        "INSERT INTO claims (id, rcfe_id, rcfe_name, rcfe_address, claim_day, claim_month,
         social_worker_email, social_worker_uid, visit_count, total_amount, status,
         review_status, payment_status, member_visits, created_at, updated_at, submitted_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
        params![
            claim.id.to_string(),
            claim.rcfe_id,
            claim.rcfe_name,
            claim.rcfe_address,
            claim.claim_day.to_string(),
            claim.claim_month,
            claim.social_worker_email,
            claim.social_worker_uid,
            claim.visit_count,
            claim.total_amount,
            claim.status.as_str(),
            claim.review_status,
            claim.payment_status,
            member_visits,
            ts_string(&claim.created_at),
            ts_string(&claim.updated_at),
            claim.submitted_at.as_ref().map(ts_string),
        ],
    )?;
    Ok(())
}

pub fn get_claim(conn: &Connection, id: &Uuid) -> Result<Option<Claim>, DatabaseError> {
    let sql = format!("SELECT {CLAIM_COLUMNS} FROM claims WHERE id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let result = stmt.query_row(params![id.to_string()], claim_row);

    match result {
        Ok(row) => Ok(Some(claim_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Ordered visit membership for a claim, as recorded at creation.
pub fn get_claim_visit_ids(
    conn: &Connection,
    claim_id: &Uuid,
) -> Result<Vec<Uuid>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT visit_id FROM claim_visits WHERE claim_id = ?1 ORDER BY position ASC",
    )?;
    let rows = stmt.query_map(params![claim_id.to_string()], |row| {
        row.get::<_, String>(0)
    })?;

    let mut ids = Vec::new();
    for row in rows {
        let raw = row?;
        ids.push(
            Uuid::parse_str(&raw)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        );
    }
    Ok(ids)
}

pub fn insert_claim_visits(
    conn: &Connection,
    claim_id: &Uuid,
    visit_ids: &[Uuid],
) -> Result<(), DatabaseError> {
    let mut stmt = conn.prepare(
        "INSERT INTO claim_visits (claim_id, visit_id, position) VALUES (?1, ?2, ?3)",
    )?;
    for (position, visit_id) in visit_ids.iter().enumerate() {
        stmt.execute(params![
            claim_id.to_string(),
            visit_id.to_string(),
            position as i64
        ])?;
    }
    Ok(())
}

pub fn delete_claim(conn: &Connection, claim_id: &Uuid) -> Result<(), DatabaseError> {
    conn.execute(
        "DELETE FROM claim_visits WHERE claim_id = ?1",
        params![claim_id.to_string()],
    )?;
    let rows = conn.execute(
        "DELETE FROM claims WHERE id = ?1",
        params![claim_id.to_string()],
    )?;
    if rows == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Claim".into(),
            id: claim_id.to_string(),
        });
    }
    Ok(())
}

/// Stamp a claim submitted. The caller supplies the single timestamp
/// shared with every visit in the batch.
pub fn mark_claim_submitted(
    conn: &Connection,
    claim_id: &Uuid,
    submitted_at: &chrono::NaiveDateTime,
) -> Result<(), DatabaseError> {
    let rows = conn.execute(
        "UPDATE claims SET status = 'submitted', submitted_at = ?2, updated_at = ?2
         WHERE id = ?1",
        params![claim_id.to_string(), ts_string(submitted_at)],
    )?;
    if rows == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Claim".into(),
            id: claim_id.to_string(),
        });
    }
    Ok(())
}

/// Rewrite the denormalized member_visits mirror.
pub fn update_claim_member_visits(
    conn: &Connection,
    claim_id: &Uuid,
    member_visits: &[VisitSummary],
    updated_at: &chrono::NaiveDateTime,
) -> Result<(), DatabaseError> {
    let json = serde_json::to_string(member_visits)
        .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?;
    let rows = conn.execute(
        "UPDATE claims SET member_visits = ?2, updated_at = ?3 WHERE id = ?1",
        params![claim_id.to_string(), json, ts_string(updated_at)],
    )?;
    if rows == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Claim".into(),
            id: claim_id.to_string(),
        });
    }
    Ok(())
}

// Internal row type for Claim mapping
struct ClaimRow {
    id: String,
    rcfe_id: String,
    rcfe_name: String,
    rcfe_address: String,
    claim_day: String,
    claim_month: String,
    social_worker_email: String,
    social_worker_uid: Option<String>,
    visit_count: i64,
    total_amount: i64,
    status: String,
    review_status: Option<String>,
    payment_status: Option<String>,
    member_visits: String,
    created_at: String,
    updated_at: String,
    submitted_at: Option<String>,
}

fn claim_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ClaimRow> {
    Ok(ClaimRow {
        id: row.get(0)?,
        rcfe_id: row.get(1)?,
        rcfe_name: row.get(2)?,
        rcfe_address: row.get(3)?,
        claim_day: row.get(4)?,
        claim_month: row.get(5)?,
        social_worker_email: row.get(6)?,
        social_worker_uid: row.get(7)?,
        visit_count: row.get(8)?,
        total_amount: row.get(9)?,
        status: row.get(10)?,
        review_status: row.get(11)?,
        payment_status: row.get(12)?,
        member_visits: row.get(13)?,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
        submitted_at: row.get(16)?,
    })
}

fn claim_from_row(row: ClaimRow) -> Result<Claim, DatabaseError> {
    Ok(Claim {
        id: Uuid::parse_str(&row.id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        rcfe_id: row.rcfe_id,
        rcfe_name: row.rcfe_name,
        rcfe_address: row.rcfe_address,
        claim_day: parse_date(&row.claim_day)?,
        claim_month: row.claim_month,
        social_worker_email: row.social_worker_email,
        social_worker_uid: row.social_worker_uid,
        visit_count: row.visit_count,
        total_amount: row.total_amount,
        status: ClaimStatus::from_str(&row.status)?,
        review_status: row.review_status,
        payment_status: row.payment_status,
        member_visits: serde_json::from_str(&row.member_visits).unwrap_or_default(),
        created_at: parse_ts(&row.created_at)?,
        updated_at: parse_ts(&row.updated_at)?,
        submitted_at: row.submitted_at.as_deref().map(parse_ts).transpose()?,
    })
}
