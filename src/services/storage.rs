use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Filesystem operations the upload pipeline depends on.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Moves a fully written staging file to its final location.
    ///
    /// The target must never be observable in a partially written state.
    async fn promote(&self, staged: &Path, target: &Path) -> io::Result<()>;

    /// Size in bytes of the file at `path`.
    async fn file_size(&self, path: &Path) -> io::Result<u64>;

    /// Whether the staging and final roots are reachable directories.
    async fn health_check(&self) -> bool;
}

/// Local filesystem store rooted at a temp and a final directory.
pub struct LocalStorageService {
    temp_root: PathBuf,
    final_root: PathBuf,
}

impl LocalStorageService {
    pub fn new(temp_root: PathBuf, final_root: PathBuf) -> Self {
        Self {
            temp_root,
            final_root,
        }
    }
}

#[async_trait]
impl StorageService for LocalStorageService {
    async fn promote(&self, staged: &Path, target: &Path) -> io::Result<()> {
        match fs::rename(staged, target).await {
            Ok(()) => Ok(()),
            Err(e) if is_cross_device(&e) => {
                tracing::warn!(
                    "Rename {:?} -> {:?} crosses volumes, copying instead",
                    staged,
                    target
                );
                copy_then_swap(staged, target).await
            }
            Err(e) => Err(e),
        }
    }

    async fn file_size(&self, path: &Path) -> io::Result<u64> {
        Ok(fs::metadata(path).await?.len())
    }

    async fn health_check(&self) -> bool {
        is_dir(&self.temp_root).await && is_dir(&self.final_root).await
    }
}

async fn is_dir(path: &Path) -> bool {
    fs::metadata(path).await.is_ok_and(|m| m.is_dir())
}

fn is_cross_device(e: &io::Error) -> bool {
    const EXDEV: i32 = 18;
    e.kind() == io::ErrorKind::CrossesDevices || e.raw_os_error() == Some(EXDEV)
}

/// Copy-based promotion for staging and final roots on different volumes.
///
/// The data is copied into a hidden sibling of `target` and synced, then renamed
/// over `target` (same volume, so atomic). The staging file is removed last;
/// once `target` is in place a failed removal only leaves the staging file behind.
pub async fn copy_then_swap(staged: &Path, target: &Path) -> io::Result<()> {
    let file_name = target
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "target has no file name"))?;
    let mut partial_name = std::ffi::OsString::from(".");
    partial_name.push(file_name);
    partial_name.push(".partial");
    let partial = target.with_file_name(partial_name);

    if let Err(e) = copy_synced(staged, &partial).await {
        let _ = fs::remove_file(&partial).await;
        return Err(e);
    }

    if let Err(e) = fs::rename(&partial, target).await {
        let _ = fs::remove_file(&partial).await;
        return Err(e);
    }

    if let Err(e) = fs::remove_file(staged).await {
        tracing::warn!(
            "{:?} committed but staging file {:?} could not be removed: {}",
            target,
            staged,
            e
        );
    }

    Ok(())
}

async fn copy_synced(from: &Path, to: &Path) -> io::Result<()> {
    let mut source = fs::File::open(from).await?;
    let mut dest = fs::File::create(to).await?;
    tokio::io::copy(&mut source, &mut dest).await?;
    dest.sync_all().await
}
