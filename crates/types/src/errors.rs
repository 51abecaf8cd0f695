//! Error types for identifier and document handling

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TypesError {
    #[error("invalid identifier {did}: {reason}")]
    InvalidFormat { did: String, reason: String },

    #[error("invalid document {did}: {reason}")]
    InvalidDocument { did: String, reason: String },

    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("unknown status code {0}")]
    UnknownStatus(i32),
}

pub type Result<T> = std::result::Result<T, TypesError>;
