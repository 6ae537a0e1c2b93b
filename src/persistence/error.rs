//! This module contains the error types for the persistence layer.

use thiserror::Error;

/// Errors that can occur in the persistence layer.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The underlying store is unreachable or a driver operation failed.
    #[error("The data store is unavailable: {0}")]
    Unavailable(String),

    /// The requested item was not found in the data store.
    #[error("The requested item was not found: {0}")]
    NotFound(String),

    /// An error occurred during serialization or deserialization of a
    /// stored payload.
    #[error("Failed to serialize or deserialize stored data: {0}")]
    Serialization(String),

    /// An error occurred while preparing the store's schema.
    #[error("A schema migration failed: {0}")]
    Migration(String),
}

impl From<sqlx::Error> for PersistenceError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => PersistenceError::NotFound(err.to_string()),
            other => PersistenceError::Unavailable(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        PersistenceError::Serialization(err.to_string())
    }
}
