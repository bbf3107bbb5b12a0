use anyhow::{anyhow, bail, Result};
use image::DynamicImage;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::mask::{decode_mask, encode_mask};
use super::preprocess::{letterbox, Letterboxed};
use crate::application::ports::Prediction;
use crate::domain::detection::{BBox, Category, RawInstance};
use crate::domain::model::{InferenceParams, ModelConfig};

const MAX_DETECTIONS: usize = 20;

/// Cliente del endpoint remoto de segmentación (plataforma BML).
pub struct RemoteEngine {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    classes: Vec<String>,
    input_size: [u32; 2],
}

#[derive(Debug, Deserialize)]
struct RemoteResponse {
    #[serde(default)]
    results: Vec<RemoteInstance>,
    #[serde(default)]
    metadata: Option<RemoteMetadata>,
}

#[derive(Debug, Deserialize)]
struct RemoteInstance {
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    bbox: Option<Vec<f32>>,
    #[serde(default)]
    mask: Option<String>,
    #[serde(default)]
    area: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct RemoteMetadata {
    model_version: Option<String>,
    time_ms: Option<u64>,
}

impl RemoteEngine {
    pub fn new(endpoint: String, api_key: String, timeout: Duration, config: &ModelConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            endpoint,
            api_key,
            classes: config.classes.clone(),
            input_size: config.input_size,
        }
    }

    pub async fn infer(&self, image: Arc<DynamicImage>, params: &InferenceParams) -> Result<Prediction> {
        let [w, h] = self.input_size;
        let (lb, image_base64) = tokio::task::spawn_blocking(move || -> Result<(Letterboxed, String)> {
            let lb = letterbox(&image, w, h);
            let encoded = lb.to_png_base64()?;
            Ok((lb, encoded))
        })
        .await??;

        let body = json!({
            "data": {
                "image": image_base64,
                "format": "base64"
            },
            "params": {
                "threshold": params.confidence_threshold,
                "nms_threshold": params.nms_threshold,
                "return_mask": true,
                "return_bbox": true,
                "max_detections": MAX_DETECTIONS,
                "classes": self.classes
            }
        });

        info!("Llamando al modelo remoto: {}", self.endpoint);
        let res = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header("X-Baidu-Access-Token", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            bail!("API remota respondió {}: {}", status, text);
        }

        let payload: RemoteResponse = res
            .json()
            .await
            .map_err(|e| anyhow!("respuesta remota con formato inesperado: {}", e))?;

        let instances = tokio::task::spawn_blocking({
            let threshold = params.confidence_threshold;
            move || to_instances(payload.results, &lb, threshold)
        })
        .await??;

        let metadata = payload.metadata;
        Ok(Prediction {
            instances,
            model_version: metadata.as_ref().and_then(|m| m.model_version.clone()),
            reported_time_ms: metadata.as_ref().and_then(|m| m.time_ms),
        })
    }
}

/// Las cajas y máscaras remotas vienen en el espacio de la imagen enviada
/// (letterbox) y se devuelven al espacio original.
fn to_instances(results: Vec<RemoteInstance>, lb: &Letterboxed, threshold: f32) -> Result<Vec<RawInstance>> {
    let mut instances = Vec::with_capacity(results.len());

    for r in results {
        if r.score < threshold {
            continue;
        }
        let category = r
            .category
            .as_deref()
            .map(Category::from_label)
            .unwrap_or(Category::Unknown);

        let bbox = match r.bbox.as_deref() {
            Some([x1, y1, x2, y2, ..]) => lb.unletterbox_box(&BBox::new(*x1, *y1, *x2, *y2)),
            _ => {
                warn!("Instancia remota sin caja válida");
                BBox::new(0.0, 0.0, 0.0, 0.0)
            }
        };

        let mut instance = RawInstance::new(category, r.score, bbox);
        if let Some(area) = r.area {
            instance = instance.with_area(area / (lb.scale * lb.scale));
        }
        if let Some(mask) = r.mask.as_deref() {
            let decoded = decode_mask(mask)?;
            instance = instance.with_mask(encode_mask(&lb.mask_to_original(&decoded))?);
        }
        instances.push(instance);
    }

    Ok(instances)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn letterboxed() -> Letterboxed {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(200, 100, Rgb([9, 9, 9])));
        letterbox(&img, 512, 512)
    }

    #[test]
    fn remote_results_are_filtered_and_mapped_back() {
        let payload: RemoteResponse = serde_json::from_value(json!({
            "results": [
                {"category": "手术", "score": 0.95, "bbox": [25.6, 153.6, 256.0, 256.0]},
                {"category": "观察", "score": 0.30, "bbox": [0, 0, 10, 10]},
                {"category": "其他", "score": 0.70}
            ],
            "metadata": {"model_version": "bml-2.1", "time_ms": 87}
        }))
        .unwrap();
        assert_eq!(payload.metadata.as_ref().unwrap().time_ms, Some(87));

        let out = to_instances(payload.results, &letterboxed(), 0.5).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].category, Category::Surgery);
        assert!((out[0].bbox.x2 - 100.0).abs() < 1e-3);
        assert!((out[0].bbox.y2 - 50.0).abs() < 1e-3);
        assert_eq!(out[1].category, Category::Unknown);
        assert_eq!(out[1].area, 0.0);
    }

    #[test]
    fn malformed_mask_is_an_error() {
        let payload: RemoteResponse = serde_json::from_value(json!({
            "results": [{"category": "手术", "score": 0.9, "bbox": [0, 0, 5, 5], "mask": "%%%"}]
        }))
        .unwrap();
        assert!(to_instances(payload.results, &letterboxed(), 0.5).is_err());
    }

    #[tokio::test]
    async fn unreachable_endpoint_fails() {
        let engine = RemoteEngine::new(
            "http://127.0.0.1:9/predict".into(),
            "key".into(),
            Duration::from_secs(2),
            &ModelConfig::default(),
        );
        let img = Arc::new(DynamicImage::ImageRgb8(RgbImage::new(32, 32)));
        assert!(engine.infer(img, &InferenceParams::default()).await.is_err());
    }
}
