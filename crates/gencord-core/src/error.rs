use thiserror::Error;

/// Failure taxonomy for core operations. Persistence problems never show up
/// here — the writer task logs them and the in-memory state carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Nieprawidłowe hasło")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),
}
