use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("store error: {0}")]
    Sled(#[from] sled::Error),
    #[error("store value encoding error: {0}")]
    Json(#[from] serde_json::Error),
}
