// yop-cloud SDK - upload and download files to yop-cloud storage

pub mod config;
pub mod storage;
pub mod types;
pub mod utils;

// Re-exports for convenience
pub use config::ClientConfig;
pub use storage::StorageClient;
pub use types::{DownloadResult, RemoteEntry, StorageError, StorageResult, UploadResult};
pub use utils::{NoProgress, ProgressReporter, TracingProgress, TransferProgress};
