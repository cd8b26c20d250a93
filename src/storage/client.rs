//! yop-cloud storage client.
//!
//! Async reqwest client holding an immutable [`ClientConfig`]. Each operation
//! is a single request/response round trip; `download` first lists the remote
//! path to tell files from folders.

use crate::config::ClientConfig;
use crate::storage::archive::{self, TempArchive};
use crate::storage::transfer::{
    check_status, content_disposition, endpoint, file_body_stream, object_id_from_body,
    write_body_to_file,
};
use crate::storage::{DOWNLOAD_PATH, FOLDER_HEADER, UPLOAD_PATH};
use crate::types::{DownloadResult, RemoteEntry, StorageError, StorageResult, UploadResult};
use crate::utils::{ProgressReporter, TracingProgress};
use reqwest::header::CONTENT_DISPOSITION;
use reqwest::{Body, Client, RequestBuilder};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Client for the yop-cloud storage service.
///
/// Cloning is cheap: clones share the connection pool, the configuration
/// and the progress reporter.
#[derive(Clone)]
pub struct StorageClient {
    http: Client,
    config: Arc<ClientConfig>,
    progress: Arc<dyn ProgressReporter>,
}

impl StorageClient {
    /// Create a client for `host_url` authenticating with `token`.
    pub fn new(host_url: &str, token: &str) -> StorageResult<Self> {
        Self::from_config(ClientConfig::new(host_url, token)?)
    }

    /// Create a client from an already validated configuration.
    pub fn from_config(config: ClientConfig) -> StorageResult<Self> {
        let mut builder = Client::builder()
            .user_agent(format!("yop-cloud-sdk/{}", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| StorageError::Configuration(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            config: Arc::new(config),
            progress: Arc::new(TracingProgress),
        })
    }

    /// Create a client from `YOP_HOST_URL` / `YOP_TOKEN`.
    pub fn from_env() -> StorageResult<Self> {
        Self::from_config(ClientConfig::from_env()?)
    }

    /// Replace the progress reporter (defaults to [`TracingProgress`]).
    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Upload a local file or directory under the `destination` key.
    ///
    /// Directories are sent as a gzip tarball flagged with `X-Is-Folder`;
    /// the temporary archive is removed whether or not the upload succeeds.
    pub async fn upload(
        &self,
        source: impl AsRef<Path>,
        destination: &str,
    ) -> StorageResult<UploadResult> {
        let source = source.as_ref();
        let metadata = match tokio::fs::metadata(source).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::LocalNotFound(source.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };

        if metadata.is_dir() {
            let archive = archive::pack_dir(source).await?;
            self.upload_file(archive.path(), &source.display().to_string(), destination, true)
                .await
        } else {
            self.upload_file(source, &source.display().to_string(), destination, false)
                .await
        }
    }

    /// Upload an in-memory buffer under the `destination` key.
    pub async fn upload_bytes(
        &self,
        data: impl Into<Vec<u8>>,
        destination: &str,
    ) -> StorageResult<UploadResult> {
        let data = data.into();
        let size = data.len() as u64;

        self.progress.start(destination, Some(size));
        let result = match self.send_upload(Body::from(data), destination, false).await {
            Ok(result) => result,
            Err(e) => {
                self.progress.fail(destination, &e);
                return Err(e);
            }
        };
        self.progress.finish(destination, size);

        Ok(UploadResult { bytes_sent: size, ..result })
    }

    /// Download a remote file or folder to `local_path`.
    ///
    /// Folders arrive as a tarball and are extracted into `local_path`,
    /// which is created if needed.
    pub async fn download(
        &self,
        remote_path: &str,
        local_path: impl AsRef<Path>,
    ) -> StorageResult<DownloadResult> {
        let local_path = local_path.as_ref();
        let is_folder = self.is_remote_folder(remote_path).await?;

        // Directory that must exist before anything is written
        let target_dir: PathBuf = if is_folder {
            local_path.to_path_buf()
        } else {
            local_path.parent().map(Path::to_path_buf).unwrap_or_default()
        };
        if !target_dir.as_os_str().is_empty() {
            tokio::fs::create_dir_all(&target_dir).await?;
        }

        // Folders are extracted into the resolved directory, so `.` still
        // gets a sibling archive; claim it before any bytes are requested.
        let folder_target = if is_folder {
            let dir = tokio::fs::canonicalize(local_path).await?;
            let archive = TempArchive::reserve(archive::archive_path_for(&dir)?).await?;
            Some((dir, archive))
        } else {
            None
        };

        let download_path = format!("{}{}", DOWNLOAD_PATH, remote_path.trim_start_matches('/'));
        let url = endpoint(self.config.host_url(), &download_path)?;
        let mut request = self.authorized(self.http.get(url));
        if is_folder {
            request = request.header(FOLDER_HEADER, "true");
        }

        debug!(remote = %remote_path, folder = is_folder, "Requesting download");
        let response = check_status(request.send().await?, remote_path).await?;

        let bytes_received = if let Some((dir, archive)) = folder_target {
            let received =
                write_body_to_file(response, archive.path(), remote_path, self.progress.as_ref()).await?;
            archive::unpack(archive.path(), &dir).await?;
            received
        } else {
            write_body_to_file(response, local_path, remote_path, self.progress.as_ref()).await?
        };

        info!(
            remote = %remote_path,
            local = %local_path.display(),
            bytes = bytes_received,
            folder = is_folder,
            "Download completed"
        );

        Ok(DownloadResult {
            source: remote_path.to_string(),
            local_path: local_path.to_path_buf(),
            bytes_received,
            is_folder,
        })
    }

    /// List the entries stored under `remote_path`.
    pub async fn list(&self, remote_path: &str) -> StorageResult<Vec<RemoteEntry>> {
        let url = endpoint(self.config.host_url(), remote_path)?;
        let response = self.authorized(self.http.get(url)).send().await?;
        let response = check_status(response, remote_path).await?;

        let body = response.text().await?;
        let entries: Vec<RemoteEntry> = serde_json::from_str(&body)?;
        debug!(remote = %remote_path, count = entries.len(), "Listed remote path");
        Ok(entries)
    }

    /// A remote path is a plain file when its listing holds exactly one entry
    /// named like the path's last segment; anything else is a folder.
    pub async fn is_remote_folder(&self, remote_path: &str) -> StorageResult<bool> {
        let entries = self.list(remote_path).await?;
        Ok(!is_single_file_listing(&entries, remote_path))
    }

    // ── Internal helpers ────────────────────────────────────────────

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(self.config.token())
    }

    async fn upload_file(
        &self,
        path: &Path,
        label: &str,
        destination: &str,
        is_folder: bool,
    ) -> StorageResult<UploadResult> {
        let file = tokio::fs::File::open(path).await?;
        let total = file.metadata().await?.len();
        let sent = Arc::new(AtomicU64::new(0));

        self.progress.start(label, Some(total));
        let stream = file_body_stream(
            file,
            self.config.chunk_size(),
            label.to_string(),
            total,
            self.progress.clone(),
            sent.clone(),
        );
        let result = match self
            .send_upload(Body::wrap_stream(stream), destination, is_folder)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                self.progress.fail(label, &e);
                return Err(e);
            }
        };

        let bytes_sent = sent.load(Ordering::Relaxed);
        self.progress.finish(label, bytes_sent);

        Ok(UploadResult { bytes_sent, ..result })
    }

    async fn send_upload(
        &self,
        body: Body,
        destination: &str,
        is_folder: bool,
    ) -> StorageResult<UploadResult> {
        let url = endpoint(self.config.host_url(), UPLOAD_PATH)?;
        let mut request = self
            .authorized(self.http.post(url))
            .header(CONTENT_DISPOSITION, content_disposition(destination));
        if is_folder {
            request = request.header(FOLDER_HEADER, "true");
        }

        debug!(destination = %destination, folder = is_folder, "Sending upload");
        let response = check_status(request.body(body).send().await?, destination).await?;
        let body = response.text().await?;

        let object_id = object_id_from_body(&body, destination);
        info!(destination = %destination, object_id = %object_id, folder = is_folder, "Upload completed");

        Ok(UploadResult {
            object_id,
            destination: destination.to_string(),
            bytes_sent: 0,
            is_folder,
        })
    }
}

impl std::fmt::Debug for StorageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn is_single_file_listing(entries: &[RemoteEntry], remote_path: &str) -> bool {
    let base_name = remote_path.rsplit('/').next().unwrap_or("");
    entries.len() == 1 && entries[0].file_name == base_name
}
