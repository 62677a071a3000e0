use thiserror::Error;

pub type Result<T> = std::result::Result<T, RecoError>;

/// Failure taxonomy of the recommendation pipeline. Dataset and training
/// failures are recoverable by falling back to popularity ranking;
/// validation failures are caller mistakes and surfaced immediately.
#[derive(Debug, Error)]
pub enum RecoError {
    #[error(
        "insufficient data: {records} records, {users} users, {items} items \
         (need at least {min_records} records, {min_users} users, {min_items} items)"
    )]
    InsufficientData {
        records: usize,
        users: usize,
        items: usize,
        min_records: usize,
        min_users: usize,
        min_items: usize,
    },

    #[error("unknown user: {0}")]
    UnknownUser(String),

    #[error("training failed: {0}")]
    Training(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed input: {0}")]
    Csv(#[from] csv::Error),
}
