use thiserror::Error;

/// Failure taxonomy for the ingestion pipeline. Each variant maps to a
/// distinct process exit code so scripted callers can tell configuration
/// problems apart from store-level ones.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The configuration document is missing, malformed, or violates a
    /// mapping invariant. Nothing proceeds.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// The spreadsheet source cannot be read as tabular data. Aborts
    /// ingestion for the affected table only.
    #[error("cannot read source: {0}")]
    Source(String),
    /// Opening the backing store failed.
    #[error("cannot open store: {0}")]
    Connect(String),
    /// DDL execution or table access failed at the store level.
    #[error("schema error: {0}")]
    Schema(String),
    /// A row failed to bind or execute; the whole batch was rolled back.
    #[error("upsert failed: {0}")]
    Upsert(String),
}

impl StoreError {
    pub fn exit_code(&self) -> i32 {
        match self {
            StoreError::Config(_) => 1,
            StoreError::Connect(_) | StoreError::Schema(_) => 2,
            StoreError::Upsert(_) => 3,
            StoreError::Source(_) => 4,
        }
    }
}
