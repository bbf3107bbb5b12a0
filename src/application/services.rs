use base64::{prelude::BASE64_STANDARD, Engine};
use image::DynamicImage;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::{
    application::{
        dto::{DetectRequest, DetectionOutcome},
        ports::{
            InferenceOutcome, InferencePort, Prediction, ResultStorePort, UploadStorePort,
            VisualizationPort,
        },
    },
    domain::{
        errors::{DomainError, DomainResult},
        model::ModelInfo,
        normalizer::normalize,
        record::{HistoryEntry, StoredRecord, UploadInfo},
        result::ResultDetails,
    },
};

/// Orquestador de una petición de detección:
/// imagen -> backend (o mock si falla) -> normalización -> visualización -> almacén.
#[derive(Clone)]
pub struct DetectionService {
    backend: Arc<dyn InferencePort>,
    fallback: Arc<dyn InferencePort>,
    uploads: Arc<dyn UploadStorePort>,
    results: Arc<dyn ResultStorePort>,
    renderer: Arc<dyn VisualizationPort>,
}

impl DetectionService {
    pub fn new(
        backend: Arc<dyn InferencePort>,
        fallback: Arc<dyn InferencePort>,
        uploads: Arc<dyn UploadStorePort>,
        results: Arc<dyn ResultStorePort>,
        renderer: Arc<dyn VisualizationPort>,
    ) -> Self {
        Self {
            backend,
            fallback,
            uploads,
            results,
            renderer,
        }
    }

    pub fn model_info(&self) -> ModelInfo {
        self.backend.describe()
    }

    pub fn backend_mode(&self) -> &'static str {
        self.backend.mode().as_str()
    }

    pub async fn detect(&self, req: DetectRequest) -> DomainResult<DetectionOutcome> {
        let params = req.params();
        let (image, filename) = self.resolve_image(&req).await?;
        let image = Arc::new(image);

        info!(
            "Detección sobre {} (umbral {:.2}, backend {})",
            filename,
            params.confidence_threshold,
            self.backend.mode().as_str()
        );

        let started = Instant::now();
        let (prediction, engine) = match self.backend.predict(image.clone(), &params).await {
            InferenceOutcome::Success(p) => (p, &self.backend),
            InferenceOutcome::Failure(reason) => {
                warn!("⚠️ Backend {} falló ({}), usando datos simulados", self.backend.mode().as_str(), reason);
                match self.fallback.predict(image.clone(), &params).await {
                    InferenceOutcome::Success(p) => (p, &self.fallback),
                    // El mock no falla; si ocurriera, se trata como imagen sin hallazgos.
                    InferenceOutcome::Failure(reason) => {
                        error!("❌ El backend de respaldo también falló: {}", reason);
                        (Prediction::default(), &self.fallback)
                    }
                }
            }
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let details = ResultDetails {
            model_version: prediction
                .model_version
                .clone()
                .unwrap_or_else(|| engine.model_version().to_string()),
            processing_time: prediction.reported_time_ms.unwrap_or(elapsed_ms),
            model_type: "instance_segmentation".into(),
            inference_mode: Some(engine.mode().as_str().to_string()),
        };

        let mut detection = normalize(&prediction.instances, params.confidence_threshold, details);

        if params.include_visualization && detection.has_masks() {
            let vis = self
                .renderer
                .render(self.uploads.path_of(&filename), &detection)
                .await;
            if !vis.is_empty() {
                detection.visualization_url = Some(vis.url);
                detection.mask_urls = Some(vis.mask_urls);
            }
        }

        let result_id = self.results.save(&detection, &filename).await?;
        info!(
            "✅ Resultado {} guardado: {} instancias, severidad {}",
            result_id,
            detection.total_instances,
            detection.severity.label()
        );

        Ok(DetectionOutcome {
            result_id,
            detection,
            timestamp: chrono::Local::now().to_rfc3339(),
        })
    }

    async fn resolve_image(&self, req: &DetectRequest) -> DomainResult<(DynamicImage, String)> {
        if let Some(encoded) = req.image.as_deref().filter(|s| !s.trim().is_empty()) {
            let payload = match encoded.split_once("base64,") {
                Some((_, data)) => data,
                None => encoded,
            };
            let bytes = BASE64_STANDARD
                .decode(payload.trim())
                .map_err(|e| DomainError::InvalidInput(format!("base64 inválido: {}", e)))?;

            let image = tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
                .await
                .map_err(|e| DomainError::OperationFailed(e.to_string()))?
                .map_err(|e| DomainError::InvalidInput(format!("imagen no legible: {}", e)))?;

            let image = Arc::new(image);
            let filename = self.uploads.save_image(image.clone()).await?;
            let image = Arc::try_unwrap(image).unwrap_or_else(|shared| (*shared).clone());
            return Ok((image, filename));
        }

        if let Some(filename) = req.filename.as_deref().filter(|s| !s.trim().is_empty()) {
            let image = self.uploads.load(filename).await?;
            return Ok((image, filename.to_string()));
        }

        Err(DomainError::InvalidInput("缺少图像数据".into()))
    }
}

/// Consulta de resultados guardados y subida de imágenes.
#[derive(Clone)]
pub struct RecordService {
    results: Arc<dyn ResultStorePort>,
    uploads: Arc<dyn UploadStorePort>,
    history_limit: usize,
}

impl RecordService {
    pub fn new(
        results: Arc<dyn ResultStorePort>,
        uploads: Arc<dyn UploadStorePort>,
        history_limit: usize,
    ) -> Self {
        Self {
            results,
            uploads,
            history_limit,
        }
    }

    pub async fn upload(&self, original_name: &str, bytes: Vec<u8>) -> DomainResult<UploadInfo> {
        self.uploads.save_upload(original_name, bytes).await
    }

    pub async fn get(&self, id: &str) -> DomainResult<StoredRecord> {
        self.results.get(id).await
    }

    /// Historial más reciente primero, limitado a `history_limit` entradas.
    pub async fn history(&self) -> DomainResult<Vec<HistoryEntry>> {
        self.results.history(self.history_limit).await
    }
}
