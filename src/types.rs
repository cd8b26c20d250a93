// Type definitions and error taxonomy

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Success value of an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    /// Identifier of the stored object as reported by the server, or the
    /// destination key echoed back when the server does not name one.
    pub object_id: String,
    /// Destination key the object was uploaded under
    pub destination: String,
    pub bytes_sent: u64,
    /// True when a local directory was archived and uploaded as a folder
    pub is_folder: bool,
}

/// Success value of a download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadResult {
    pub source: String,
    /// File written, or directory extracted into for folders
    pub local_path: PathBuf,
    pub bytes_received: u64,
    pub is_folder: bool,
}

/// One entry of a remote listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteEntry {
    pub file_name: String,
    /// Any other fields the server attaches (size, timestamps, ...)
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authentication rejected (HTTP {status}): {message}")]
    Auth { status: u16, message: String },

    #[error("Transfer failed: {0}")]
    Transfer(#[from] reqwest::Error),

    #[error("Not found on server: {0}")]
    NotFound(String),

    #[error("Local file {0} not found")]
    LocalNotFound(PathBuf),

    #[error("Unexpected response (HTTP {status}): {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Invalid response from server: {0}")]
    InvalidResponse(#[from] serde_json::Error),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// True for failures caused by the server rejecting the token.
    pub fn is_auth(&self) -> bool {
        matches!(self, StorageError::Auth { .. })
    }

    /// True for remote-side "not found" failures.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;
