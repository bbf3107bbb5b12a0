use serde::{Deserialize, Serialize};

use super::normalizer::DEFAULT_CONFIDENCE_THRESHOLD;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    Auto,
    Paddle,
    Onnx,
    Torch,
}

/// Configuración del modelo (normalmente `models/model_config.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub model_type: String,
    pub framework: Framework,
    pub classes: Vec<String>,
    pub input_size: [u32; 2],          // [ancho, alto]
    pub confidence_threshold: f32,     // 0..1
    pub nms_threshold: f32,            // 0..1
    pub mean: Option<[f32; 3]>,
    pub std: Option<[f32; 3]>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_type: "instance_segmentation".into(),
            framework: Framework::Auto,
            classes: vec!["观察".into(), "手术".into()],
            input_size: [512, 512],
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            nms_threshold: 0.5,
            mean: Some([0.485, 0.456, 0.406]),
            std: Some([0.229, 0.224, 0.225]),
        }
    }
}

/// Parámetros por petición.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InferenceParams {
    pub confidence_threshold: f32,
    pub nms_threshold: f32,
    pub include_visualization: bool,
}

impl Default for InferenceParams {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            nms_threshold: 0.5,
            include_visualization: true,
        }
    }
}

impl InferenceParams {
    pub fn new(
        confidence_threshold: Option<f32>,
        nms_threshold: Option<f32>,
        include_visualization: Option<bool>,
    ) -> Self {
        let defaults = Self::default();
        Self {
            confidence_threshold: confidence_threshold
                .unwrap_or(defaults.confidence_threshold)
                .clamp(0.0, 1.0),
            nms_threshold: nms_threshold.unwrap_or(defaults.nms_threshold).clamp(0.0, 1.0),
            include_visualization: include_visualization.unwrap_or(defaults.include_visualization),
        }
    }
}

/// Descripción del backend activo, expuesta en `/api/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_type: String,
    pub framework: String,
    pub classes: Vec<String>,
    pub num_classes: usize,
    pub input_size: [u32; 2],
    pub confidence_threshold: f32,
    pub nms_threshold: f32,
    pub status: String,
}
