use crate::config::UploadConfig;
use crate::services::provisioner::ensure_path_exists;
use crate::services::storage::StorageService;
use crate::utils::validation::validate_filename;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{Instrument, Span, debug, error, info, warn};

pub mod error;
pub mod types;

pub use error::IngestError;
pub use types::{Confirmation, UploadRequest};

use self::error::NO_FILENAME;
use self::types::split_filename;

pub struct UploadService {
    config: UploadConfig,
    storage: Arc<dyn StorageService>,
    span: Span,
}

impl UploadService {
    pub fn new(config: UploadConfig, storage: Arc<dyn StorageService>) -> Self {
        let span = tracing::info_span!(
            "upload_service",
            temp_path = %config.temp_path.display(),
            files_path = %config.files_path.display(),
        );

        Self {
            config,
            storage,
            span,
        }
    }

    /// Receives one file: stage it, verify its size, then promote it.
    ///
    /// On any failure after the staging file was opened it is left in place for
    /// inspection. Two uploads with the same filename are not serialized; the
    /// last successful commit wins.
    pub async fn ingest<R>(&self, upload: UploadRequest<R>) -> Result<Confirmation, IngestError>
    where
        R: AsyncRead + Unpin + Send,
    {
        self.run(upload).instrument(self.span.clone()).await
    }

    async fn run<R>(&self, upload: UploadRequest<R>) -> Result<Confirmation, IngestError>
    where
        R: AsyncRead + Unpin + Send,
    {
        info!("Upload request received");

        let Some(filename) = upload.filename.filter(|f| !f.is_empty()) else {
            error!("{}", NO_FILENAME);
            return Err(IngestError::Missing(NO_FILENAME));
        };

        if let Err(e) = validate_filename(&filename) {
            warn!("Rejected filename {:?}: {}", filename, e);
            return Err(e.into());
        }

        let (stem, extension) = split_filename(&filename);
        info!(
            filename = %filename,
            extension = %extension,
            declared_size = ?upload.declared_size,
            "File to be uploaded"
        );

        let temp_path = self.config.temp_path.join(&filename);
        let staging_path = staging_path_for(&temp_path);
        let final_path = self.config.files_path.join(&filename);

        ensure_path_exists(&temp_path).await.map_err(|e| {
            error!("Temporary files path could not be provisioned: {}", e);
            IngestError::from(e)
        })?;

        let received = self.stage(upload.body, &staging_path).await?;
        let expected = upload.declared_size.unwrap_or(received);

        let actual = self.storage.file_size(&staging_path).await.map_err(|e| {
            error!("Could not stat staging file {:?}: {}", staging_path, e);
            IngestError::Staging(e)
        })?;

        if actual != expected {
            error!(
                "Uploaded and saved files have different sizes: uploaded {}, saved {} ({:?} kept)",
                expected, actual, staging_path
            );
            return Err(IngestError::SizeMismatch { expected, actual });
        }

        ensure_path_exists(&final_path).await.map_err(|e| {
            error!("Files path could not be provisioned: {}", e);
            IngestError::from(e)
        })?;

        self.storage
            .promote(&staging_path, &final_path)
            .await
            .map_err(|e| {
                error!(
                    "File could not be saved: {:?} -> {:?}: {}",
                    staging_path, final_path, e
                );
                IngestError::CommitFailed(e)
            })?;

        info!("File uploaded to {:?} ({} bytes)", final_path, actual);

        Ok(Confirmation {
            stem: stem.to_string(),
            extension: extension.to_string(),
            filename,
            size: actual,
            path: final_path,
        })
    }

    /// Copies `body` into the staging file one chunk at a time.
    ///
    /// Returns the number of bytes read from `body`.
    async fn stage<R>(&self, mut body: R, staging_path: &Path) -> Result<u64, IngestError>
    where
        R: AsyncRead + Unpin + Send,
    {
        debug!("Writing to file {:?}", staging_path);

        let mut output = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(staging_path)
            .await
            .map_err(|e| staging_error(staging_path, e))?;

        let chunk_size = self.config.chunk_size;
        let mut buffer = vec![0u8; chunk_size];
        let mut total: u64 = 0;

        loop {
            let mut n = 0;
            while n < chunk_size {
                match body.read(&mut buffer[n..]).await {
                    Ok(0) => break,
                    Ok(read) => n += read,
                    Err(e) => {
                        // Keep what arrived for inspection
                        if let Err(write_err) = keep_partial(&mut output, &buffer[..n]).await {
                            warn!(
                                "Partial chunk of {} bytes could not be kept in {:?}: {}",
                                n, staging_path, write_err
                            );
                        }
                        warn!(
                            "Upload stream interrupted after {} bytes, {:?} kept: {}",
                            total + n as u64,
                            staging_path,
                            e
                        );
                        return Err(IngestError::Interrupted(e));
                    }
                }
            }

            if n == 0 {
                break;
            }

            debug!("Buffering chunk {}", n);
            output
                .write_all(&buffer[..n])
                .await
                .map_err(|e| staging_error(staging_path, e))?;
            total += n as u64;
        }

        output
            .flush()
            .await
            .map_err(|e| staging_error(staging_path, e))?;
        output
            .sync_all()
            .await
            .map_err(|e| staging_error(staging_path, e))?;

        debug!("Closed the file {:?}", staging_path);
        Ok(total)
    }
}

async fn keep_partial<W>(output: &mut W, partial: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    output.write_all(partial).await?;
    output.flush().await
}

fn staging_error(path: &Path, e: std::io::Error) -> IngestError {
    error!("Staging file {:?} could not be written: {}", path, e);
    IngestError::Staging(e)
}

/// `{temp_dir}/{name}` becomes `{temp_dir}/{name}~`.
pub fn staging_path_for(temp_path: &Path) -> PathBuf {
    let mut staged = OsString::from(temp_path.as_os_str());
    staged.push("~");
    PathBuf::from(staged)
}
