use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "ClaimLedger";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Address the HTTP server binds to unless CLAIMLEDGER_ADDR overrides it.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8787";

/// Get the application data directory (~/ClaimLedger/ on all platforms)
pub fn app_data_dir() -> PathBuf {
    match std::env::var_os("CLAIMLEDGER_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ClaimLedger"),
    }
}

/// Path of the ledger database file
pub fn database_path() -> PathBuf {
    app_data_dir().join("ledger.db")
}

/// Default tracing filter when RUST_LOG is unset
pub fn default_log_filter() -> String {
    "info,claimledger=debug".to_string()
}

pub fn bind_addr() -> String {
    std::env::var("CLAIMLEDGER_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
}
