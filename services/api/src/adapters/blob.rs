//! services/api/src/adapters/blob.rs
//!
//! A filesystem-backed implementation of the `BlobStorage` port. Files are
//! written below a root directory and served back by the web layer under
//! `/files/`.

use async_trait::async_trait;
use pdf_chat_core::domain::StoredBlob;
use pdf_chat_core::ports::{BlobStorage, PortError, PortResult};
use std::path::{Component, Path, PathBuf};
use tracing::info;

#[derive(Clone, Debug)]
pub struct LocalBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a storage path onto the root, refusing anything that could escape it.
    fn resolve(&self, path: &str) -> PortResult<PathBuf> {
        let relative = Path::new(path);
        let is_plain = !path.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !is_plain {
            return Err(PortError::InvalidInput(format!(
                "invalid storage path: {}",
                path
            )));
        }
        Ok(self.root.join(relative))
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/files/{}", self.public_base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl BlobStorage for LocalBlobStore {
    async fn upload(
        &self,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> PortResult<StoredBlob> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PortError::Unexpected(e.to_string()))?;
        }

        let size_bytes = i64::try_from(bytes.len())
            .map_err(|_| PortError::InvalidInput("file too large".to_string()))?;
        tokio::fs::write(&target, bytes)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        info!("Stored blob {} ({} bytes)", path, size_bytes);

        Ok(StoredBlob {
            path: path.to_string(),
            url: self.public_url(path),
            content_type: content_type.to_string(),
            size_bytes,
        })
    }

    async fn delete(&self, path: &str) -> PortResult<()> {
        let target = self.resolve(path)?;
        tokio::fs::remove_file(&target).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => PortError::NotFound(format!("Blob {} not found", path)),
            _ => PortError::Unexpected(e.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn uploads_under_root_and_builds_public_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path(), "http://example.test/");

        let blob = store
            .upload("pdfs/1_report.pdf", "application/pdf", b"%PDF-1.4".to_vec())
            .await
            .unwrap();

        assert_eq!(blob.url, "http://example.test/files/pdfs/1_report.pdf");
        assert_eq!(blob.size_bytes, 8);
        let written = std::fs::read(dir.path().join("pdfs/1_report.pdf")).unwrap();
        assert_eq!(written, b"%PDF-1.4");

        store.delete("pdfs/1_report.pdf").await.unwrap();
        assert!(matches!(
            store.delete("pdfs/1_report.pdf").await,
            Err(PortError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn rejects_paths_that_escape_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path(), "http://example.test");

        for path in ["../evil.pdf", "/etc/passwd", ""] {
            let result = store.upload(path, "application/pdf", vec![1]).await;
            assert!(matches!(result, Err(PortError::InvalidInput(_))), "{path}");
        }
    }
}
