use thiserror::Error;

use super::TodoId;

/// Failure side of a repository operation. `NotFound` is an expected
/// outcome the caller reports as such; `Internal` means the store broke.
#[derive(Debug, Error)]
pub enum TodoError {
    #[error("ToDo with ID:{0} not found")]
    NotFound(TodoId),
    #[error("Error {action} ToDo: {source:#}")]
    Internal {
        action: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl TodoError {
    pub fn internal(action: &'static str, source: impl Into<anyhow::Error>) -> Self {
        TodoError::Internal {
            action,
            source: source.into(),
        }
    }
}
