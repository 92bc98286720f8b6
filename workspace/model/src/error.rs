use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// Error types for the model layer
#[derive(Error, Debug)]
pub enum ModelError {
    /// Caller-supplied data failed a precondition; nothing was written
    #[error("Validation error: {0}")]
    Validation(String),

    /// A uniqueness or foreign key constraint was violated by the database
    #[error("Integrity error: {0}")]
    Integrity(String),

    /// Hashing a password failed
    #[error("Password hash error: {0}")]
    PasswordHash(String),

    /// Any other database failure
    #[error("Database error: {0}")]
    Database(DbErr),
}

impl From<DbErr> for ModelError {
    fn from(error: DbErr) -> Self {
        match error.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(message)) => ModelError::Integrity(message),
            Some(SqlErr::ForeignKeyConstraintViolation(message)) => ModelError::Integrity(message),
            _ => ModelError::Database(error),
        }
    }
}

impl ModelError {
    pub fn is_integrity(&self) -> bool {
        matches!(self, ModelError::Integrity(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ModelError::Validation(_))
    }
}
