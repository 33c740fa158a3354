use thiserror::Error;

/// Boxed cause carried by [`DomainError::Store`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Order does not exist")]
    NotExist,
    #[error("Order already exists")]
    AlreadyExists,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Internal error: {0}")]
    Internal(String),
    #[error("Store error: {0}")]
    Store(#[source] BoxError),
}
