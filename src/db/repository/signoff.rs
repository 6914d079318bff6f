use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{parse_ts, ts_string};
use crate::db::DatabaseError;
use crate::models::claim::{Geolocation, StoredSignOff};

/// Append an attestation row. Sign-offs are write-once; there is no
/// update or delete counterpart.
pub fn insert_signoff(conn: &Connection, signoff: &StoredSignOff) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO signoffs (id, claim_id, rcfe_id, staff_name, staff_title,
         signature, signed_at, lat, lng)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            signoff.id.to_string(),
            signoff.claim_id.map(|id| id.to_string()),
            signoff.rcfe_id,
            signoff.staff_name,
            signoff.staff_title,
            signoff.signature,
            ts_string(&signoff.signed_at),
            signoff.geolocation.map(|g| g.lat),
            signoff.geolocation.map(|g| g.lng),
        ],
    )?;
    Ok(())
}

pub fn get_signoffs_by_claim(
    conn: &Connection,
    claim_id: &Uuid,
) -> Result<Vec<StoredSignOff>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, claim_id, rcfe_id, staff_name, staff_title, signature, signed_at, lat, lng
         FROM signoffs WHERE claim_id = ?1 ORDER BY signed_at ASC",
    )?;
    let rows = stmt.query_map(params![claim_id.to_string()], signoff_row)?;

    let mut signoffs = Vec::new();
    for row in rows {
        signoffs.push(signoff_from_row(row?)?);
    }
    Ok(signoffs)
}

struct SignOffRow {
    id: String,
    claim_id: Option<String>,
    rcfe_id: String,
    staff_name: String,
    staff_title: Option<String>,
    signature: String,
    signed_at: String,
    lat: Option<f64>,
    lng: Option<f64>,
}

fn signoff_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SignOffRow> {
    Ok(SignOffRow {
        id: row.get(0)?,
        claim_id: row.get(1)?,
        rcfe_id: row.get(2)?,
        staff_name: row.get(3)?,
        staff_title: row.get(4)?,
        signature: row.get(5)?,
        signed_at: row.get(6)?,
        lat: row.get(7)?,
        lng: row.get(8)?,
    })
}

fn signoff_from_row(row: SignOffRow) -> Result<StoredSignOff, DatabaseError> {
    Ok(StoredSignOff {
        id: Uuid::parse_str(&row.id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        claim_id: row.claim_id.and_then(|s| Uuid::parse_str(&s).ok()),
        rcfe_id: row.rcfe_id,
        staff_name: row.staff_name,
        staff_title: row.staff_title,
        signature: row.signature,
        signed_at: parse_ts(&row.signed_at)?,
        geolocation: match (row.lat, row.lng) {
            (Some(lat), Some(lng)) => Some(Geolocation { lat, lng }),
            _ => None,
        },
    })
}
