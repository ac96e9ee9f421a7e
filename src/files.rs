//! File-store collaborator for block uploads

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

/// A file submitted with a block edit
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, content_type: Option<&str>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.map(str::to_string),
            bytes,
        }
    }

    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
    }

    pub fn is_image(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.starts_with("image/"))
            .unwrap_or(false)
    }
}

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Persist `file` under `folder`, returning its stable relative path
    async fn store(&self, folder: &str, file: &UploadedFile) -> Result<String>;
}

/// Stores uploads on the local filesystem under a root directory
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn store(&self, folder: &str, file: &UploadedFile) -> Result<String> {
        let name = match file.extension() {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext.to_lowercase()),
            None => Uuid::new_v4().to_string(),
        };
        let folder = folder.trim_matches('/');
        let relative = format!("{}/{}", folder, name);

        let target_dir = self.root.join(folder);
        tokio::fs::create_dir_all(&target_dir)
            .await
            .with_context(|| format!("Failed to create upload folder {:?}", target_dir))?;
        let target = target_dir.join(&name);
        tokio::fs::write(&target, &file.bytes)
            .await
            .with_context(|| format!("Failed to write upload {:?}", target))?;

        debug!("Stored upload {} as {}", file.file_name, relative);
        Ok(relative)
    }
}
