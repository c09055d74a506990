//! 同步错误定义

use thiserror::Error;
use zonemap_core::zone::DraftId;
use zonemap_core::ZoneError;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid zone data: {0}")]
    Wire(#[from] ZoneError),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rejected by server: {0}")]
    Rejected(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Zone {0} has no persisted id")]
    MissingPersistedId(DraftId),
}

pub type SyncResult<T> = Result<T, SyncError>;
