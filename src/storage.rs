use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use crate::{config::InvoiceConfig, error::AppResult};

/// Object storage for generated documents. Returns the public link.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    async fn upload(&self, file_name: &str, content_type: &str, bytes: Vec<u8>) -> AppResult<String>;
}

/// Writes files under a directory that is served at `public_url`.
pub struct LocalBlobStorage {
    root: PathBuf,
    public_url: String,
}

impl LocalBlobStorage {
    pub fn new(config: &InvoiceConfig) -> Self {
        Self {
            root: config.dir.clone(),
            public_url: config.public_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl BlobStorage for LocalBlobStorage {
    async fn upload(&self, file_name: &str, content_type: &str, bytes: Vec<u8>) -> AppResult<String> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(anyhow::Error::from)?;
        let path = self.root.join(file_name);
        fs::write(&path, bytes).await.map_err(anyhow::Error::from)?;
        tracing::debug!(path = %path.display(), content_type, "stored blob");
        Ok(format!("{}/{}", self.public_url, file_name))
    }
}
