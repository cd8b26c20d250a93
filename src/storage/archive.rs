//! Folder archives
//!
//! Directories travel as a single gzip tarball. The archive is written
//! next to the directory as a hidden `.<name>.tar.gz` file and removed once
//! the transfer is over.

use crate::types::{StorageError, StorageResult};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, warn};

/// Hidden sibling archive path for a directory: `a/b/dir` -> `a/b/.dir.tar.gz`.
pub fn archive_path_for(dir: &Path) -> StorageResult<PathBuf> {
    let name = dir.file_name().and_then(|n| n.to_str()).ok_or_else(|| {
        StorageError::Archive(format!("cannot derive an archive name from {}", dir.display()))
    })?;
    let parent = dir.parent().unwrap_or_else(|| Path::new(""));
    Ok(parent.join(format!(".{}.tar.gz", name)))
}

/// Pack the contents of `dir` into its sibling archive.
///
/// `dir` is canonicalized first so `.` and `a/..` still name a sibling.
/// The archive is removed when the returned guard is dropped.
pub async fn pack_dir(dir: &Path) -> StorageResult<TempArchive> {
    let dir = tokio::fs::canonicalize(dir).await?;
    let archive = TempArchive::reserve(archive_path_for(&dir)?).await?;

    let mut cmd = Command::new("tar");
    // Keep macOS resource forks and extended attributes out of the archive
    #[cfg(target_os = "macos")]
    cmd.arg("--disable-copyfile").arg("--no-xattrs");
    cmd.arg("-cz").arg("-f").arg(archive.path()).arg("-C").arg(&dir).arg(".");

    debug!(dir = %dir.display(), archive = %archive.path().display(), "Packing folder");
    run_tar(cmd, "Failed to archive folder").await?;
    Ok(archive)
}

/// Extract `archive` into `into_dir`, which must already exist.
pub async fn unpack(archive: &Path, into_dir: &Path) -> StorageResult<()> {
    let mut cmd = Command::new("tar");
    cmd.arg("-xf").arg(archive).arg("-C").arg(into_dir);

    debug!(archive = %archive.display(), into = %into_dir.display(), "Unpacking folder");
    run_tar(cmd, "Failed to unpack folder").await
}

async fn run_tar(mut cmd: Command, context: &str) -> StorageResult<()> {
    let output = cmd
        .output()
        .await
        .map_err(|e| StorageError::Archive(format!("{}: could not run tar: {}", context, e)))?;

    if !output.status.success() {
        return Err(StorageError::Archive(format!(
            "{}: tar exited with {}: {}",
            context,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(())
}

/// A temporary archive file, removed when dropped.
///
/// The path is created exclusively, so an existing file of the same name is
/// never overwritten or deleted.
#[derive(Debug)]
pub struct TempArchive {
    path: PathBuf,
}

impl TempArchive {
    /// Claim `path` for a new archive; fails if something already lives there.
    pub async fn reserve(path: PathBuf) -> StorageResult<Self> {
        match tokio::fs::OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(_) => Ok(Self { path }),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Err(StorageError::Archive(
                format!("{} already exists, refusing to overwrite it", path.display()),
            )),
            Err(e) => Err(e.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempArchive {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "Failed to remove temporary archive");
            }
        }
    }
}
