use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TodoError {
    #[error("Todo service unavailable")]
    Unavailable,
    #[error("Todo list key must be a user id, got {0}")]
    InvalidKey(String),
    #[error("Todo not found: {0}")]
    NotFound(u32),
}
