use crate::error::Result;
use crate::models::PackagingListItem;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;

/// Receives finished packaging lists for delivery downstream.
#[async_trait]
pub trait PackagingListNotifier: Send + Sync {
    async fn dispatch(&self, packaging_list: &[PackagingListItem]) -> Result<()>;
}

/// Writes the list as the JSON attachment procurement receives.
#[derive(Debug, Clone)]
pub struct JsonFileExporter {
    path: PathBuf,
}

impl JsonFileExporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PackagingListNotifier for JsonFileExporter {
    async fn dispatch(&self, packaging_list: &[PackagingListItem]) -> Result<()> {
        let body = serde_json::to_vec_pretty(packaging_list)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, body).await?;
        info!(
            "Exported {} packaging materials to {}",
            packaging_list.len(),
            self.path.display()
        );
        Ok(())
    }
}
