//! ClaimLedger: visit and claim ledger for community-support case
//! management.
//!
//! Visits are the canonical records; claims batch them by facility and
//! day for payment. The lifecycle is append-mostly: drafts are
//! editable, submission freezes a whole batch atomically, and a
//! facility sign-off freezes visits permanently.

pub mod api;
pub mod claims;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod fees;
pub mod guard;
pub mod matcher;
pub mod models;
pub mod signoff;
pub mod visits;
