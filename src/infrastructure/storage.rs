use crate::config::UploadConfig;
use crate::services::provisioner::ensure_path_exists;
use crate::services::storage::LocalStorageService;
use anyhow::Context;
use std::sync::Arc;
use tracing::info;

/// Creates both storage roots and returns the local store over them.
pub async fn setup_storage(config: &UploadConfig) -> anyhow::Result<Arc<LocalStorageService>> {
    for root in [&config.temp_path, &config.files_path] {
        // The provisioner works on a file path, so aim at an entry inside the root
        ensure_path_exists(&root.join(".provision"))
            .await
            .with_context(|| format!("storage root {:?} could not be created", root))?;
    }

    info!(
        "📁 Local Storage: temp={:?} files={:?}",
        config.temp_path, config.files_path
    );

    Ok(Arc::new(LocalStorageService::new(
        config.temp_path.clone(),
        config.files_path.clone(),
    )))
}
