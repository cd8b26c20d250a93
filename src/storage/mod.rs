//! Storage Module
//!
//! Client side of the yop-cloud storage service:
//! - `client`: the [`StorageClient`] entry point (upload, download, list)
//! - `transfer`: request/response plumbing shared by the operations
//! - `archive`: folder packing for directory transfers
//!
//! ## Wire contract
//!
//! Every request carries `Authorization: Bearer <token>`. Paths are resolved
//! relative to the configured host URL.
//!
//! | Operation | Request |
//! |-----------|---------|
//! | upload    | `POST upload/` with `Content-Disposition: attachment; filename="<key>"` |
//! | download  | `GET download/<path>` |
//! | list      | `GET <path>`, JSON array of `{"file_name": ...}` |
//!
//! Folder transfers add `X-Is-Folder: true` and move a gzip tarball.
//! Only `200 OK` counts as success.

pub mod archive;
mod client;
mod transfer;

pub use client::StorageClient;

/// Upload endpoint, relative to the host URL.
pub const UPLOAD_PATH: &str = "upload/";

/// Download endpoint prefix, relative to the host URL.
pub const DOWNLOAD_PATH: &str = "download/";

/// Header flagging a transfer as a folder archive.
pub const FOLDER_HEADER: &str = "X-Is-Folder";
