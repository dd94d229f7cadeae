//! Persistence errors shared by every backend.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("'{0}' is not a valid identifier")]
    InvalidIdentifier(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Backend(#[from] mongodb::error::Error),

    #[error("failed to encode document: {0}")]
    Encode(#[from] bson::ser::Error),
}

impl DbError {
    pub(crate) fn book_not_found(id: &str) -> Self {
        Self::NotFound {
            entity: "book",
            id: id.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DbError>;
