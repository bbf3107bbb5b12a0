use async_trait::async_trait;
use image::DynamicImage;
use std::path::PathBuf;
use std::sync::Arc;

use crate::domain::{
    detection::RawInstance,
    errors::DomainResult,
    model::{InferenceParams, ModelInfo},
    record::{HistoryEntry, StoredRecord, UploadInfo},
    result::{DetectionResult, Visualization},
};

/// Modo de inferencia que se anota en `details.inference_mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceMode {
    Local,
    Remote,
    Mock,
}

impl InferenceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            InferenceMode::Local => "local",
            InferenceMode::Remote => "remote",
            InferenceMode::Mock => "mock",
        }
    }
}

/// Salida correcta de un backend: instancias ya filtradas por umbral y en
/// coordenadas de la imagen original.
#[derive(Debug, Clone, Default)]
pub struct Prediction {
    pub instances: Vec<RawInstance>,
    pub model_version: Option<String>,
    /// Tiempo reportado por el propio backend (ms), si lo hay.
    pub reported_time_ms: Option<u64>,
}

impl Prediction {
    pub fn new(instances: Vec<RawInstance>) -> Self {
        Self { instances, ..Default::default() }
    }
}

/// Resultado explícito en la frontera del adaptador. Quien llama decide qué
/// hacer con `Failure` (en la práctica: pasar al mock).
#[derive(Debug, Clone)]
pub enum InferenceOutcome {
    Success(Prediction),
    Failure(String),
}

#[async_trait]
pub trait InferencePort: Send + Sync {
    async fn predict(&self, image: Arc<DynamicImage>, params: &InferenceParams) -> InferenceOutcome;
    fn mode(&self) -> InferenceMode;
    fn model_version(&self) -> &str;
    fn describe(&self) -> ModelInfo;
}

#[async_trait]
pub trait ResultStorePort: Send + Sync {
    async fn save(&self, result: &DetectionResult, filename: &str) -> DomainResult<String>;
    async fn get(&self, id: &str) -> DomainResult<StoredRecord>;
    async fn history(&self, limit: usize) -> DomainResult<Vec<HistoryEntry>>;
}

#[async_trait]
pub trait UploadStorePort: Send + Sync {
    async fn save_upload(&self, original_name: &str, bytes: Vec<u8>) -> DomainResult<UploadInfo>;
    async fn save_image(&self, image: Arc<DynamicImage>) -> DomainResult<String>;
    async fn load(&self, filename: &str) -> DomainResult<DynamicImage>;
    fn path_of(&self, filename: &str) -> PathBuf;
}

#[async_trait]
pub trait VisualizationPort: Send + Sync {
    /// Nunca falla: los errores se registran y se devuelve una visualización vacía.
    async fn render(&self, source: PathBuf, result: &DetectionResult) -> Visualization;
}
