use serde::{Deserialize, Serialize};

use super::detection::Category;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    #[serde(rename = "正常")]
    Normal,
    #[serde(rename = "轻度")]
    Mild,
    #[serde(rename = "中度")]
    Moderate,
    #[serde(rename = "重度")]
    Severe,
}

impl Severity {
    /// Umbrales estrictos: 0.5 exacto es Moderate y 0.2 exacto es Mild.
    pub fn from_surgery_ratio(ratio: f32) -> Self {
        if ratio > 0.5 {
            Severity::Severe
        } else if ratio > 0.2 {
            Severity::Moderate
        } else {
            Severity::Mild
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Severity::Normal => "正常",
            Severity::Mild => "轻度",
            Severity::Moderate => "中度",
            Severity::Severe => "重度",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub id: usize,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub label: Category,
    pub confidence: f32,
    pub area: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationMask {
    pub id: usize,
    pub mask: String,
    pub category: Category,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassLabel {
    pub id: usize,
    pub category: Category,
    pub confidence: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDistribution {
    #[serde(rename = "观察")]
    pub observation: usize,
    #[serde(rename = "手术")]
    pub surgery: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultDetails {
    pub model_version: String,
    /// Milisegundos.
    pub processing_time: u64,
    pub model_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inference_mode: Option<String>,
}

impl Default for ResultDetails {
    fn default() -> Self {
        Self {
            model_version: "v1.0.0".into(),
            processing_time: 0,
            model_type: "instance_segmentation".into(),
            inference_mode: None,
        }
    }
}

/// Registro canónico, independiente del backend que produjo las instancias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub disease_detected: bool,
    pub total_instances: usize,
    pub observation_count: usize,
    pub surgery_count: usize,
    pub severity: Severity,
    pub confidence: f32,
    pub bounding_boxes: Vec<BoundingBox>,
    pub segmentation_masks: Vec<SegmentationMask>,
    pub class_labels: Vec<ClassLabel>,
    pub class_distribution: ClassDistribution,
    pub recommendations: Vec<String>,
    pub details: ResultDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visualization_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask_urls: Option<Vec<String>>,
}

impl DetectionResult {
    pub fn has_masks(&self) -> bool {
        !self.segmentation_masks.is_empty()
    }
}

/// Artefactos generados por el renderizado de máscaras.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Visualization {
    pub url: String,
    pub mask_urls: Vec<String>,
}

impl Visualization {
    pub fn is_empty(&self) -> bool {
        self.url.is_empty() && self.mask_urls.is_empty()
    }
}
