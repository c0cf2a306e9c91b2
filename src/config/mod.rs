use std::env;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("temp path and files path must be distinct directories (both are '{0}')")]
    SharedRoots(String),

    #[error("chunk size must be greater than zero")]
    ZeroChunkSize,

    #[error("files route '{0}' must start with '/' and name a sub-path")]
    InvalidFilesRoute(String),

    #[error("files route '{0}' collides with a built-in route")]
    ReservedFilesRoute(String),
}

/// First path segments already routed by the application
const RESERVED_SEGMENTS: &[&str] = &["upload", "health", "swagger-ui", "api-docs"];

/// Upload service configuration, read once at startup
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Root for staging files (default: "data/temp")
    pub temp_path: PathBuf,

    /// Root for committed files (default: "data/files")
    pub files_path: PathBuf,

    /// Route the committed files are served under (default: `files_path` as a route)
    pub files_route: String,

    /// Directory holding the log file (default: "logs")
    pub logs_path: PathBuf,

    /// Log file name inside `logs_path` (default: "app.log")
    pub app_log: String,

    /// Read/write chunk size in bytes (default: 10000)
    pub chunk_size: usize,

    /// Address the HTTP server binds to (default: "0.0.0.0:3010")
    pub bind_address: String,

    /// Maximum request body size in bytes (default: 1 GB)
    pub max_upload_size: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            temp_path: PathBuf::from("data/temp"),
            files_path: PathBuf::from("data/files"),
            files_route: "/data/files".to_string(),
            logs_path: PathBuf::from("logs"),
            app_log: "app.log".to_string(),
            chunk_size: 10_000,
            bind_address: "0.0.0.0:3010".to_string(),
            max_upload_size: 1024 * 1024 * 1024, // 1 GB
        }
    }
}

impl UploadConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        let files_path = env::var("DATA_FILES_PATH")
            .map(PathBuf::from)
            .unwrap_or(default.files_path);

        Self {
            temp_path: env::var("DATA_TEMP_PATH")
                .map(PathBuf::from)
                .unwrap_or(default.temp_path),

            files_route: env::var("DATA_FILES_ROUTE")
                .unwrap_or_else(|_| files_route_for(&files_path)),

            files_path,

            logs_path: env::var("LOGS_PATH")
                .map(PathBuf::from)
                .unwrap_or(default.logs_path),

            app_log: env::var("APP_LOG").unwrap_or(default.app_log),

            chunk_size: env::var("UPLOAD_SERVICE_CHUNK_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.chunk_size),

            bind_address: env::var("APP_BIND_ADDRESS").unwrap_or(default.bind_address),

            max_upload_size: env::var("MAX_UPLOAD_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_upload_size),
        }
    }

    /// Checks the invariants the upload pipeline relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.temp_path == self.files_path {
            return Err(ConfigError::SharedRoots(
                self.temp_path.display().to_string(),
            ));
        }

        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }

        if !self.files_route.starts_with('/') || self.files_route.trim_matches('/').is_empty() {
            return Err(ConfigError::InvalidFilesRoute(self.files_route.clone()));
        }

        let first_segment = self.files_route.trim_start_matches('/').split('/').next();
        if first_segment.is_some_and(|s| RESERVED_SEGMENTS.contains(&s)) {
            return Err(ConfigError::ReservedFilesRoute(self.files_route.clone()));
        }

        Ok(())
    }

    pub fn log_file(&self) -> PathBuf {
        self.logs_path.join(&self.app_log)
    }
}

/// Serves `data/files` under `/data/files`.
pub fn files_route_for(files_path: &Path) -> String {
    let segments: Vec<String> = files_path
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    format!("/{}", segments.join("/"))
}
