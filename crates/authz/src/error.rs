//! Auth failures and their HTTP mapping.

use libris_db::DbError;
use libris_http::error::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("auth failure: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<DbError> for AuthError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Conflict(message) => AuthError::Conflict(message),
            // A token subject the store cannot parse is just a bad token.
            DbError::InvalidIdentifier(_) => AuthError::Unauthorized("Not authorized, token failed"),
            other => AuthError::Internal(other.into()),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(message) => AppError::validation(vec![], message),
            AuthError::Conflict(message) => AppError::conflict(vec![], message),
            AuthError::Unauthorized(message) => AppError::unauthorized(message),
            AuthError::Internal(source) => AppError::Internal(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
