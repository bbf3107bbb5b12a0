use async_trait::async_trait;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::application::ports::UploadStorePort;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::record::UploadInfo;

pub const ALLOWED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "bmp"];

/// Imágenes subidas o decodificadas desde base64, guardadas en disco.
pub struct FsUploadStore {
    directory: PathBuf,
    max_file_size: usize,
}

impl FsUploadStore {
    pub fn new(directory: impl Into<PathBuf>, max_file_size: usize) -> Self {
        Self {
            directory: directory.into(),
            max_file_size,
        }
    }

    pub fn allowed_extension(name: &str) -> Option<String> {
        let (_, ext) = name.rsplit_once('.')?;
        let ext = ext.to_ascii_lowercase();
        ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
    }

    fn unique_name(prefix: &str, ext: &str) -> String {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let short = Uuid::new_v4().simple().to_string();
        format!("{}{}_{}.{}", prefix, stamp, &short[..8], ext)
    }

    fn checked_path(&self, filename: &str) -> DomainResult<PathBuf> {
        let bad = filename.is_empty()
            || filename.contains("..")
            || filename.contains('/')
            || filename.contains('\\')
            || Path::new(filename).is_absolute();
        if bad {
            return Err(DomainError::InvalidInput(format!("nombre de fichero inválido: {}", filename)));
        }
        Ok(self.directory.join(filename))
    }
}

#[async_trait]
impl UploadStorePort for FsUploadStore {
    async fn save_upload(&self, original_name: &str, bytes: Vec<u8>) -> DomainResult<UploadInfo> {
        if original_name.trim().is_empty() {
            return Err(DomainError::InvalidInput("未选择文件".into()));
        }
        let ext = Self::allowed_extension(original_name)
            .ok_or_else(|| DomainError::InvalidInput("不支持的文件格式".into()))?;
        if bytes.len() > self.max_file_size {
            return Err(DomainError::InvalidInput(format!(
                "文件大小超过限制（最大{}MB）",
                self.max_file_size / 1024 / 1024
            )));
        }

        tokio::fs::create_dir_all(&self.directory).await?;
        let filename = Self::unique_name("", &ext);
        let path = self.directory.join(&filename);
        tokio::fs::write(&path, &bytes).await?;
        info!("Imagen subida: {} ({} bytes)", filename, bytes.len());

        Ok(UploadInfo {
            preview_url: format!("/uploads/{}", filename),
            path: path.to_string_lossy().to_string(),
            filename,
            upload_time: chrono::Local::now().to_rfc3339(),
        })
    }

    async fn save_image(&self, image: Arc<DynamicImage>) -> DomainResult<String> {
        tokio::fs::create_dir_all(&self.directory).await?;
        let filename = Self::unique_name("temp_", "jpg");
        let path = self.directory.join(&filename);

        tokio::task::spawn_blocking(move || image.to_rgb8().save(&path))
            .await
            .map_err(|e| DomainError::OperationFailed(e.to_string()))?
            .map_err(|e| DomainError::Storage(e.to_string()))?;
        Ok(filename)
    }

    async fn load(&self, filename: &str) -> DomainResult<DynamicImage> {
        let path = self.checked_path(filename)?;
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(DomainError::NotFound("文件不存在".into()));
        }
        tokio::task::spawn_blocking(move || image::open(&path))
            .await
            .map_err(|e| DomainError::OperationFailed(e.to_string()))?
            .map_err(|e| DomainError::InvalidInput(format!("imagen no legible: {}", e)))
    }

    fn path_of(&self, filename: &str) -> PathBuf {
        self.directory.join(filename)
    }
}
