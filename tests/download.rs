//! Download and listing flows against a mock yop-cloud server.

use mockito::Matcher;
use tempfile::TempDir;
use yop_cloud_sdk::storage::archive;
use yop_cloud_sdk::{StorageClient, StorageError};

const CSV: &str = "date,amount\n2024-01-01,10\n2024-01-02,12\n";

#[tokio::test]
async fn test_list_entries() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/reports")
        .match_header("authorization", "Bearer abc123")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"file_name":"q1.csv","size":120},{"file_name":"q2.csv","size":98}]"#)
        .create_async()
        .await;

    let client = StorageClient::new(&server.url(), "abc123").unwrap();
    let entries = client.list("reports").await.unwrap();

    mock.assert_async().await;
    let names: Vec<&str> = entries.iter().map(|e| e.file_name.as_str()).collect();
    assert_eq!(names, ["q1.csv", "q2.csv"]);
    assert_eq!(entries[0].extra.get("size"), Some(&serde_json::json!(120)));
}

#[tokio::test]
async fn test_list_invalid_json() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/reports")
        .with_status(200)
        .with_body("<html>oops</html>")
        .create_async()
        .await;

    let client = StorageClient::new(&server.url(), "abc123").unwrap();
    let err = client.list("reports").await.unwrap_err();
    assert!(matches!(err, StorageError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_download_file() {
    let mut server = mockito::Server::new_async().await;
    let listing = server
        .mock("GET", "/reports/q1.csv")
        .with_status(200)
        .with_body(r#"[{"file_name":"q1.csv"}]"#)
        .create_async()
        .await;
    let download = server
        .mock("GET", "/download/reports/q1.csv")
        .match_header("authorization", "Bearer abc123")
        .match_header("x-is-folder", Matcher::Missing)
        .with_status(200)
        .with_body(CSV)
        .create_async()
        .await;

    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("out/nested/q1.csv");

    let client = StorageClient::new(&server.url(), "abc123").unwrap();
    let result = client.download("reports/q1.csv", &target).await.unwrap();

    listing.assert_async().await;
    download.assert_async().await;
    assert!(!result.is_folder);
    assert_eq!(result.local_path, target);
    assert_eq!(result.bytes_received, CSV.len() as u64);
    assert_eq!(std::fs::read_to_string(&target).unwrap(), CSV);
}

#[tokio::test]
async fn test_download_folder_extracts_archive() {
    // Build the tarball the server would send
    let fixture = TempDir::new().unwrap();
    let folder = fixture.path().join("results");
    std::fs::create_dir_all(folder.join("raw")).unwrap();
    std::fs::write(folder.join("summary.txt"), "all good").unwrap();
    std::fs::write(folder.join("raw/data.csv"), CSV).unwrap();
    let packed = archive::pack_dir(&folder).await.unwrap();
    let tarball = std::fs::read(packed.path()).unwrap();

    let mut server = mockito::Server::new_async().await;
    let listing = server
        .mock("GET", "/results")
        .with_status(200)
        .with_body(r#"[{"file_name":"summary.txt"},{"file_name":"raw"}]"#)
        .create_async()
        .await;
    let download = server
        .mock("GET", "/download/results")
        .match_header("x-is-folder", "true")
        .with_status(200)
        .with_body(tarball.clone())
        .create_async()
        .await;

    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("restored");

    let client = StorageClient::new(&server.url(), "abc123").unwrap();
    let result = client.download("results", &target).await.unwrap();

    listing.assert_async().await;
    download.assert_async().await;
    assert!(result.is_folder);
    assert_eq!(result.bytes_received, tarball.len() as u64);
    assert_eq!(std::fs::read_to_string(target.join("summary.txt")).unwrap(), "all good");
    assert_eq!(std::fs::read_to_string(target.join("raw/data.csv")).unwrap(), CSV);
    assert!(!temp_dir.path().join(".restored.tar.gz").exists());
}

#[tokio::test]
async fn test_download_folder_into_path_without_file_name() {
    let fixture = TempDir::new().unwrap();
    let folder = fixture.path().join("results");
    std::fs::create_dir_all(&folder).unwrap();
    std::fs::write(folder.join("summary.txt"), "all good").unwrap();
    let packed = archive::pack_dir(&folder).await.unwrap();
    let tarball = std::fs::read(packed.path()).unwrap();

    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/results")
        .with_status(200)
        .with_body(r#"[{"file_name":"summary.txt"},{"file_name":"raw"}]"#)
        .create_async()
        .await;
    let download = server
        .mock("GET", "/download/results")
        .match_header("x-is-folder", "true")
        .with_status(200)
        .with_body(tarball)
        .create_async()
        .await;

    // `restored/sub/..` resolves to `restored`, like downloading into `.`
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("restored/sub/..");

    let client = StorageClient::new(&server.url(), "abc123").unwrap();
    let result = client.download("results", &target).await.unwrap();

    download.assert_async().await;
    assert!(result.is_folder);
    let restored = temp_dir.path().join("restored");
    assert_eq!(std::fs::read_to_string(restored.join("summary.txt")).unwrap(), "all good");
    assert!(!temp_dir.path().join(".restored.tar.gz").exists());
}

#[tokio::test]
async fn test_download_folder_keeps_existing_archive_name() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/results")
        .with_status(200)
        .with_body(r#"[{"file_name":"a.txt"},{"file_name":"b.txt"}]"#)
        .create_async()
        .await;
    let download = server
        .mock("GET", "/download/results")
        .expect(0)
        .create_async()
        .await;

    let temp_dir = TempDir::new().unwrap();
    let existing = temp_dir.path().join(".restored.tar.gz");
    std::fs::write(&existing, "user data").unwrap();

    let client = StorageClient::new(&server.url(), "abc123").unwrap();
    let err = client
        .download("results", temp_dir.path().join("restored"))
        .await
        .unwrap_err();

    download.assert_async().await;
    assert!(matches!(err, StorageError::Archive(_)));
    assert_eq!(std::fs::read_to_string(&existing).unwrap(), "user data");
}

#[tokio::test]
async fn test_download_folder_with_single_child() {
    // One entry that does not match the basename means a folder
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/logs")
        .with_status(200)
        .with_body(r#"[{"file_name":"app.log"}]"#)
        .create_async()
        .await;
    let download = server
        .mock("GET", "/download/logs")
        .match_header("x-is-folder", "true")
        .with_status(200)
        .with_body("not a tarball")
        .create_async()
        .await;

    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("logs");

    let client = StorageClient::new(&server.url(), "abc123").unwrap();
    let err = client.download("logs", &target).await.unwrap_err();

    download.assert_async().await;
    assert!(matches!(err, StorageError::Archive(_)));
    assert!(!temp_dir.path().join(".logs.tar.gz").exists());
}

#[tokio::test]
async fn test_download_missing_remote_is_not_found() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/reports/missing.csv")
        .with_status(404)
        .create_async()
        .await;
    let download = server
        .mock("GET", "/download/reports/missing.csv")
        .expect(0)
        .create_async()
        .await;

    let temp_dir = TempDir::new().unwrap();
    let client = StorageClient::new(&server.url(), "abc123").unwrap();
    let err = client
        .download("reports/missing.csv", temp_dir.path().join("missing.csv"))
        .await
        .unwrap_err();

    download.assert_async().await;
    assert!(matches!(err, StorageError::NotFound(ref p) if p == "reports/missing.csv"));
}

#[tokio::test]
async fn test_download_not_found_after_listing() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/q1.csv")
        .with_status(200)
        .with_body(r#"[{"file_name":"q1.csv"}]"#)
        .create_async()
        .await;
    server
        .mock("GET", "/download/q1.csv")
        .with_status(404)
        .create_async()
        .await;

    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("q1.csv");

    let client = StorageClient::new(&server.url(), "abc123").unwrap();
    let err = client.download("q1.csv", &target).await.unwrap_err();

    assert!(err.is_not_found());
    assert!(!target.exists());
}

#[tokio::test]
async fn test_download_unauthorized_is_auth_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/reports/q1.csv")
        .with_status(401)
        .with_body("token expired")
        .create_async()
        .await;

    let temp_dir = TempDir::new().unwrap();
    let client = StorageClient::new(&server.url(), "old-token").unwrap();
    let err = client
        .download("reports/q1.csv", temp_dir.path().join("q1.csv"))
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::Auth { status: 401, .. }));
}
