use serde::{Deserialize, Serialize};

use super::result::{DetectionResult, Severity};

/// Registro persistido: un fichero JSON por resultado, inmutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: String,
    pub filename: String,
    pub timestamp: String,
    pub result: DetectionResult,
}

/// Resumen de un registro para el listado de historial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub timestamp: String,
    pub disease_detected: bool,
    pub severity: Severity,
    pub total_instances: usize,
    pub observation_count: usize,
    pub surgery_count: usize,
    pub confidence: f32,
}

impl From<&StoredRecord> for HistoryEntry {
    fn from(r: &StoredRecord) -> Self {
        Self {
            id: r.id.clone(),
            timestamp: r.timestamp.clone(),
            disease_detected: r.result.disease_detected,
            severity: r.result.severity,
            total_instances: r.result.total_instances,
            observation_count: r.result.observation_count,
            surgery_count: r.result.surgery_count,
            confidence: r.result.confidence,
        }
    }
}

/// Imagen subida y guardada en el directorio de uploads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadInfo {
    pub filename: String,
    pub path: String,
    pub preview_url: String,
    pub upload_time: String,
}
