use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, error, info};

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("directory '{path}' could not be created: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("'{0}' exists but is not a directory")]
    NotADirectory(PathBuf),
}

/// Makes sure every ancestor directory of `target` exists.
///
/// `target` is a path to a file; only its directory component is touched.
/// Directories are created one level at a time walking down from the root, so
/// a concurrent caller creating the same prefix is harmless. Nothing is ever
/// removed, and a failure leaves already-created prefixes in place.
pub async fn ensure_path_exists(target: &Path) -> Result<(), ProvisionError> {
    let Some(dirname) = target.parent() else {
        return Ok(());
    };

    let mut base_path = PathBuf::new();
    for component in dirname.components() {
        base_path.push(component);

        match fs::metadata(&base_path).await {
            Ok(meta) if meta.is_dir() => {
                debug!("Directory {:?} found", base_path);
            }
            Ok(_) => {
                error!("{:?} exists but is not a directory", base_path);
                return Err(ProvisionError::NotADirectory(base_path));
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                create_single(&base_path).await?;
            }
            Err(e) => {
                error!("Directory {:?} could not be inspected: {}", base_path, e);
                return Err(ProvisionError::Create {
                    path: base_path,
                    source: e,
                });
            }
        }
    }

    Ok(())
}

async fn create_single(path: &Path) -> Result<(), ProvisionError> {
    match fs::create_dir(path).await {
        Ok(()) => {
            info!("Directory {:?} created", path);
            Ok(())
        }
        // Lost a race with another request provisioning the same prefix
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            if fs::metadata(path).await.is_ok_and(|m| m.is_dir()) {
                debug!("Directory {:?} created concurrently", path);
                Ok(())
            } else {
                error!("{:?} exists but is not a directory", path);
                Err(ProvisionError::NotADirectory(path.to_path_buf()))
            }
        }
        Err(e) => {
            error!("Directory {:?} could not be created: {}", path, e);
            Err(ProvisionError::Create {
                path: path.to_path_buf(),
                source: e,
            })
        }
    }
}
