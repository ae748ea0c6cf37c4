use thiserror::Error;

/// Reasons a raw string is not a usable device identity.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("device id must not be empty")]
    Empty,

    #[error("device id is longer than {max} bytes")]
    TooLong { max: usize },

    #[error("device id contains a forbidden character: {0:?}")]
    ForbiddenChar(char),

    #[error("device id must not be '.' or '..'")]
    Traversal,
}
