use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{parse_ts, ts_string};
use crate::db::DatabaseError;
use crate::models::claim::ClaimEvent;

/// Append one audit event to a claim's history. Events are never
/// updated or removed.
pub fn insert_claim_event(
    conn: &Connection,
    claim_id: &Uuid,
    created_at: &chrono::NaiveDateTime,
    payload: &serde_json::Value,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO claim_events (claim_id, created_at, payload) VALUES (?1, ?2, ?3)",
        params![
            claim_id.to_string(),
            ts_string(created_at),
            payload.to_string()
        ],
    )?;
    Ok(())
}

/// Events for one claim, newest first.
pub fn get_claim_events(
    conn: &Connection,
    claim_id: &Uuid,
) -> Result<Vec<ClaimEvent>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT claim_id, created_at, payload FROM claim_events
         WHERE claim_id = ?1 ORDER BY id DESC",
    )?;
    let rows = stmt.query_map(params![claim_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;

    let mut events = Vec::new();
    for row in rows {
        let (claim_id, created_at, payload) = row?;
        events.push(ClaimEvent {
            claim_id: Uuid::parse_str(&claim_id)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            created_at: parse_ts(&created_at)?,
            payload: serde_json::from_str(&payload)
                .unwrap_or(serde_json::Value::Null),
        });
    }
    Ok(events)
}
