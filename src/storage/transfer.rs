// Wire-level helpers shared by the client operations

use crate::types::{StorageError, StorageResult};
use crate::utils::{ProgressReporter, TransferProgress};
use bytes::Bytes;
use futures::{Stream, StreamExt, TryStreamExt};
use reqwest::{Response, StatusCode, Url};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Resolve `path` against the host URL the way a relative link is resolved.
/// Leading slashes are dropped so remote paths stay under the base.
pub(crate) fn endpoint(base: &Url, path: &str) -> StorageResult<Url> {
    base.join(path.trim_start_matches('/'))
        .map_err(|e| StorageError::Configuration(format!("cannot build URL for {:?}: {}", path, e)))
}

/// `Content-Disposition` value naming the destination key.
pub(crate) fn content_disposition(destination: &str) -> String {
    let escaped = destination.replace('\\', "\\\\").replace('"', "\\\"");
    format!("attachment; filename=\"{}\"", escaped)
}

/// Map a non-200 response onto the error taxonomy.
pub(crate) async fn check_status(response: Response, target: &str) -> StorageResult<Response> {
    let status = response.status();
    if status == StatusCode::OK {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(StorageError::Auth {
            status: status.as_u16(),
            message: body,
        }),
        StatusCode::NOT_FOUND => Err(StorageError::NotFound(target.to_string())),
        _ => Err(StorageError::UnexpectedStatus { status: status.as_u16(), body }),
    }
}

/// Pick the object identifier out of an upload response body.
///
/// JSON objects may name it as `id`, `file_name` or `path`; anything else
/// falls back to the destination key.
pub(crate) fn object_id_from_body(body: &str, destination: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| {
            ["id", "file_name", "path"].iter().find_map(|key| match &json[*key] {
                serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
        })
        .unwrap_or_else(|| destination.to_string())
}

/// Stream a file in `chunk_size` pieces, reporting progress and counting
/// bytes into `sent`.
pub(crate) fn file_body_stream(
    file: File,
    chunk_size: usize,
    label: String,
    total: u64,
    progress: Arc<dyn ProgressReporter>,
    sent: Arc<AtomicU64>,
) -> impl Stream<Item = std::io::Result<Bytes>> + Send + 'static {
    futures::stream::try_unfold(file, move |mut file| {
        let label = label.clone();
        let progress = progress.clone();
        let sent = sent.clone();
        async move {
            let mut buf = vec![0u8; chunk_size];
            let n = file.read(&mut buf).await?;
            if n == 0 {
                return Ok(None);
            }
            buf.truncate(n);

            let transferred = sent.fetch_add(n as u64, Ordering::Relaxed) + n as u64;
            progress.advance(TransferProgress {
                label: &label,
                transferred,
                chunk: n as u64,
                total: Some(total),
            });
            Ok::<_, std::io::Error>(Some((Bytes::from(buf), file)))
        }
    })
}

/// Write a response body to `path` chunk by chunk. A partially written file
/// is removed on failure.
pub(crate) async fn write_body_to_file(
    response: Response,
    path: &Path,
    label: &str,
    progress: &dyn ProgressReporter,
) -> StorageResult<u64> {
    let total = response.content_length();
    progress.start(label, total);

    let body = response.bytes_stream().map_err(StorageError::from);
    match stream_into(body, path, label, total, progress).await {
        Ok(received) => {
            progress.finish(label, received);
            Ok(received)
        }
        Err(e) => {
            let _ = tokio::fs::remove_file(path).await;
            progress.fail(label, &e);
            Err(e)
        }
    }
}

async fn stream_into<S>(
    body: S,
    path: &Path,
    label: &str,
    total: Option<u64>,
    progress: &dyn ProgressReporter,
) -> StorageResult<u64>
where
    S: Stream<Item = StorageResult<Bytes>>,
{
    futures::pin_mut!(body);
    let mut file = File::create(path).await?;
    let mut received = 0u64;

    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        received += chunk.len() as u64;
        progress.advance(TransferProgress {
            label,
            transferred: received,
            chunk: chunk.len() as u64,
            total,
        });
    }

    file.flush().await?;
    Ok(received)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::NoProgress;
    use tempfile::TempDir;

    #[test]
    fn test_endpoint_resolution() {
        let root = Url::parse("https://example.test").unwrap();
        assert_eq!(endpoint(&root, "upload/").unwrap().as_str(), "https://example.test/upload/");
        assert_eq!(
            endpoint(&root, "/reports/q1.csv").unwrap().as_str(),
            "https://example.test/reports/q1.csv"
        );

        let nested = Url::parse("https://example.test/api/").unwrap();
        assert_eq!(
            endpoint(&nested, "download/a b.txt").unwrap().as_str(),
            "https://example.test/api/download/a%20b.txt"
        );

        // Without a trailing slash the last segment is replaced
        let bare = Url::parse("https://example.test/api").unwrap();
        assert_eq!(endpoint(&bare, "upload/").unwrap().as_str(), "https://example.test/upload/");
    }

    #[test]
    fn test_content_disposition_escapes_quotes() {
        assert_eq!(content_disposition("dir/report.csv"), "attachment; filename=\"dir/report.csv\"");
        assert_eq!(content_disposition("a\"b"), "attachment; filename=\"a\\\"b\"");
    }

    #[test]
    fn test_object_id_from_body() {
        assert_eq!(object_id_from_body(r#"{"id":"obj-7"}"#, "report.csv"), "obj-7");
        assert_eq!(object_id_from_body(r#"{"id":42}"#, "report.csv"), "42");
        assert_eq!(object_id_from_body(r#"{"file_name":"r.csv"}"#, "report.csv"), "r.csv");
        assert_eq!(object_id_from_body(r#"{"id":""}"#, "report.csv"), "report.csv");
        assert_eq!(object_id_from_body("OK", "report.csv"), "report.csv");
        assert_eq!(object_id_from_body("", "report.csv"), "report.csv");
    }

    #[tokio::test]
    async fn test_file_body_stream_chunks() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data.bin");
        let data: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        std::fs::write(&path, &data).unwrap();

        let file = File::open(&path).await.unwrap();
        let sent = Arc::new(AtomicU64::new(0));
        let chunks: Vec<Bytes> = file_body_stream(
            file,
            300,
            "data.bin".into(),
            data.len() as u64,
            Arc::new(NoProgress),
            sent.clone(),
        )
        .try_collect()
        .await
        .unwrap();

        let sizes: Vec<usize> = chunks.iter().map(|c| c.len()).collect();
        assert!(sizes.iter().all(|&s| s <= 300));
        assert_eq!(chunks.concat(), data);
        assert_eq!(sent.load(Ordering::Relaxed), 1000);
    }

    #[tokio::test]
    async fn test_stream_into_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.txt");
        let body = futures::stream::iter(vec![
            Ok(Bytes::from_static(b"hello ")),
            Ok(Bytes::from_static(b"world")),
        ]);

        let received = stream_into(body, &path, "out.txt", Some(11), &NoProgress).await.unwrap();
        assert_eq!(received, 11);
        assert_eq!(std::fs::read(&path).unwrap(), b"hello world");
    }
}
