pub mod claims;
pub mod export;
pub mod health;
pub mod signoff;
pub mod visits;
