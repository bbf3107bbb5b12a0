use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::application::ports::ResultStorePort;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::record::{HistoryEntry, StoredRecord};
use crate::domain::result::DetectionResult;

/// Un fichero `<id>.json` por resultado, escrito una sola vez.
pub struct FsResultStore {
    directory: PathBuf,
}

impl FsResultStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self { directory: directory.into() }
    }

    fn record_path(&self, id: &str) -> DomainResult<PathBuf> {
        let id = Uuid::parse_str(id)
            .map_err(|_| DomainError::InvalidInput(format!("id de resultado inválido: {}", id)))?;
        Ok(self.directory.join(format!("{}.json", id.hyphenated())))
    }
}

#[async_trait]
impl ResultStorePort for FsResultStore {
    async fn save(&self, result: &DetectionResult, filename: &str) -> DomainResult<String> {
        let id = Uuid::new_v4().to_string();
        let record = StoredRecord {
            id: id.clone(),
            filename: filename.to_string(),
            timestamp: chrono::Local::now().to_rfc3339(),
            result: result.clone(),
        };

        tokio::fs::create_dir_all(&self.directory).await?;
        let path = self.record_path(&id)?;
        let body = serde_json::to_string_pretty(&record)?;
        tokio::fs::write(&path, body).await?;
        debug!("Resultado guardado en {}", path.display());
        Ok(id)
    }

    async fn get(&self, id: &str) -> DomainResult<StoredRecord> {
        let path = self.record_path(id)?;
        let body = match tokio::fs::read_to_string(&path).await {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DomainError::NotFound("结果不存在".into()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&body)?)
    }

    async fn history(&self, limit: usize) -> DomainResult<Vec<HistoryEntry>> {
        let mut entries = Vec::new();
        let mut dir = match tokio::fs::read_dir(&self.directory).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(entries),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let parsed = tokio::fs::read_to_string(&path)
                .await
                .map_err(DomainError::from)
                .and_then(|s| serde_json::from_str::<StoredRecord>(&s).map_err(DomainError::from));
            match parsed {
                Ok(record) => entries.push(HistoryEntry::from(&record)),
                Err(e) => warn!("Ignorando {}: {}", path.display(), e),
            }
        }

        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries.truncate(limit);
        Ok(entries)
    }
}
