use thiserror::Error;

/// Closed error taxonomy for gateway operations.
///
/// Every fault the store can surface maps onto exactly one of these
/// tags; anything unenumerated becomes a logged `Io`. No retries happen
/// at this layer (retry policy lives in the connection factory).
#[derive(Debug, Error)]
pub enum StoreError {
    /// Session/login handshake failed. Never retried.
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("table not found: {0}")]
    TableNotFound(String),
    #[error("table already exists: {0}")]
    TableAlreadyExists(String),
    #[error("column family {family} not declared on table {table}")]
    ColumnFamilyNotFound { table: String, family: String },
    #[error("validation error: {0}")]
    Invalid(#[from] models::errors::ModelError),
    /// Any other communication fault, surfaced as store-unreachable.
    #[error("error while talking to the store: {0}")]
    Io(String),
}

impl StoreError {
    pub fn io(err: impl std::fmt::Display) -> Self {
        Self::Io(err.to_string())
    }

    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            StoreError::Authentication(_) => 2001,
            StoreError::TableNotFound(_) => 2002,
            StoreError::TableAlreadyExists(_) => 2003,
            StoreError::ColumnFamilyNotFound { .. } => 2004,
            StoreError::Invalid(_) => 2005,
            StoreError::Io(_) => 2100,
        }
    }
}
