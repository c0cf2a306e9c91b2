use std::path::PathBuf;

/// One uploaded file part, consumed by a single ingestion.
pub struct UploadRequest<R> {
    pub filename: Option<String>,
    /// Size claimed by the client, when it sent one
    pub declared_size: Option<u64>,
    pub body: R,
}

impl<R> UploadRequest<R> {
    pub fn new(filename: Option<String>, declared_size: Option<u64>, body: R) -> Self {
        Self {
            filename,
            declared_size,
            body,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub filename: String,
    pub stem: String,
    pub extension: String,
    pub size: u64,
    pub path: PathBuf,
}

/// Splits a filename into stem and extension, the extension keeping its dot.
///
/// Leading dots belong to the stem, so `.env` has no extension.
pub fn split_filename(filename: &str) -> (&str, &str) {
    let leading = filename.len() - filename.trim_start_matches('.').len();
    match filename[leading..].rfind('.') {
        Some(idx) => filename.split_at(leading + idx),
        None => (filename, ""),
    }
}
