//! Shared API state and the caller-identity extractor.

use std::sync::{Arc, Mutex, MutexGuard};

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use rusqlite::Connection;

use crate::api::error::ApiError;
use crate::models::identity::Caller;

/// Shared state for API handlers: the ledger database behind a mutex.
/// rusqlite connections are not Sync; handlers hold the guard only for
/// the duration of one operation.
#[derive(Clone)]
pub struct ApiContext {
    db: Arc<Mutex<Connection>>,
}

impl ApiContext {
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
        }
    }

    pub fn db(&self) -> Result<MutexGuard<'_, Connection>, ApiError> {
        self.db
            .lock()
            .map_err(|_| ApiError::Internal("database lock poisoned".into()))
    }
}

/// Header carrying the authenticated caller's uid, set by the identity
/// gateway in front of this service.
pub const CALLER_UID_HEADER: &str = "x-caller-uid";
pub const CALLER_EMAIL_HEADER: &str = "x-caller-email";
pub const CALLER_ADMIN_HEADER: &str = "x-caller-admin";

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let uid = header(CALLER_UID_HEADER).ok_or(ApiError::Unauthorized)?;
        let email = header(CALLER_EMAIL_HEADER).ok_or(ApiError::Unauthorized)?;
        let is_admin = header(CALLER_ADMIN_HEADER)
            .is_some_and(|v| v.eq_ignore_ascii_case("true") || v == "1");

        Ok(Caller {
            uid: uid.to_string(),
            email: email.to_string(),
            is_admin,
        })
    }
}
