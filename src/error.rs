//! Error types for Sealchain

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    PrevSealMismatch,
    SealValidation,
    TxSealValidation,
    NoValidator,
    InsufficientFields,
    EmptyTransactionList,
    DuplicateTransaction(String),
    ReservedTransactionId(String),
    NotFound(String),
    DatabaseError(String),
    SerializationError(String),
    IoError(String),
    ConfigError(String),
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ChainError::PrevSealMismatch => write!(f, "PrevSeal value mismatch"),
            ChainError::SealValidation => write!(f, "Seal validation failed"),
            ChainError::TxSealValidation => write!(f, "TxSeal validation failed"),
            ChainError::NoValidator => write!(f, "Validator not defined"),
            ChainError::InsufficientFields => {
                write!(f, "Previous seal or transaction list seal is not set")
            }
            ChainError::EmptyTransactionList => write!(f, "Empty transaction list"),
            ChainError::DuplicateTransaction(id) => {
                write!(f, "Transaction {} is already in the pool", id)
            }
            ChainError::ReservedTransactionId(id) => {
                write!(f, "Transaction id {:?} is reserved", id)
            }
            ChainError::NotFound(what) => write!(f, "Not found: {}", what),
            ChainError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            ChainError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            ChainError::IoError(msg) => write!(f, "IO error: {}", msg),
            ChainError::ConfigError(msg) => write!(f, "Config error: {}", msg),
        }
    }
}

impl std::error::Error for ChainError {}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        ChainError::SerializationError(err.to_string())
    }
}

impl From<rusqlite::Error> for ChainError {
    fn from(err: rusqlite::Error) -> Self {
        ChainError::DatabaseError(err.to_string())
    }
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::ConfigError(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
