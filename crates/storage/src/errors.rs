use didreg_types::TypesError;

/// Storage errors
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("key already exists: {key}")]
    AlreadyExists { key: String },
    #[error("key not found: {key}")]
    NotFound { key: String },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("codec error: {0}")]
    Codec(#[from] TypesError),
    #[error("database error: {0}")]
    Database(#[from] sled::Error),
    #[error("store is closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, StoreError>;
