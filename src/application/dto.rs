use serde::{Deserialize, Serialize};

use crate::domain::{
    model::InferenceParams,
    record::{HistoryEntry, UploadInfo},
    result::DetectionResult,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectRequest {
    /// Imagen en base64, con o sin prefijo `data:image/...;base64,`.
    pub image: Option<String>,
    /// Nombre de un fichero ya subido a `/api/upload`.
    pub filename: Option<String>,
    pub confidence_threshold: Option<f32>,
    pub nms_threshold: Option<f32>,
    pub include_visualization: Option<bool>,
}

impl DetectRequest {
    pub fn params(&self) -> InferenceParams {
        InferenceParams::new(
            self.confidence_threshold,
            self.nms_threshold,
            self.include_visualization,
        )
    }
}

/// Resultado de `DetectionService::detect`.
#[derive(Debug, Clone)]
pub struct DetectionOutcome {
    pub result_id: String,
    pub detection: DetectionResult,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectResponse {
    pub success: bool,
    pub result_id: String,
    pub detection: DetectionResult,
    pub timestamp: String,
}

impl From<DetectionOutcome> for DetectResponse {
    fn from(o: DetectionOutcome) -> Self {
        Self {
            success: true,
            result_id: o.result_id,
            detection: o.detection,
            timestamp: o.timestamp,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub filename: String,
    pub path: String,
    pub preview_url: String,
    pub upload_time: String,
}

impl From<UploadInfo> for UploadResponse {
    fn from(u: UploadInfo) -> Self {
        Self {
            success: true,
            filename: u.filename,
            path: u.path,
            preview_url: u.preview_url,
            upload_time: u.upload_time,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub model_connected: bool,
    pub model_type: String,
    pub supported_classes: Vec<String>,
    pub use_local_model: bool,
    pub local_model_available: bool,
    pub model_path: Option<String>,
    pub backend: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
