use anyhow::{anyhow, Result};
use image::DynamicImage;
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::Session;
use ort::value::{DynValue, Value};
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, warn};

use super::local::LocalRuntime;
use super::mask::{encode_mask, mask_from_probabilities};
use super::preprocess::{letterbox, Letterboxed};
use crate::domain::detection::{BBox, Category, RawInstance};
use crate::domain::model::{InferenceParams, ModelConfig};

/// Modelo de segmentación de instancias exportado a ONNX.
/// Salidas por posición: boxes [N,4], labels [N], scores [N], masks [N,(1,)H,W].
pub struct OnnxSegEngine {
    // `Session::run` necesita `&mut`; la sesión se comparte entre peticiones.
    session: Mutex<Session>,
    classes: Vec<String>,
    input_size: [u32; 2],
    mean: Option<[f32; 3]>,
    std: Option<[f32; 3]>,
}

impl OnnxSegEngine {
    pub fn load(path: &Path, config: &ModelConfig) -> Result<Self> {
        let mut builder = Session::builder()?.with_intra_threads(4)?;

        // CUDA es opcional: si está disponible se registra, si no continuamos en CPU.
        let cuda = CUDAExecutionProvider::default().build();
        if let Ok(builder_with_cuda) = builder.clone().with_execution_providers([cuda]) {
            builder = builder_with_cuda;
        }

        let model_bytes = fs::read(path)?;
        let session = builder.commit_from_memory(&model_bytes)?;

        Ok(Self {
            session: Mutex::new(session),
            classes: config.classes.clone(),
            input_size: config.input_size,
            mean: config.mean,
            std: config.std,
        })
    }
}

/// Convierte las salidas posicionales del modelo en instancias sobre la imagen original.
fn parse_outputs(
    classes: &[String],
    outputs: &[Option<&DynValue>; 4],
    lb: &Letterboxed,
    params: &InferenceParams,
) -> Result<Vec<RawInstance>> {
    let [boxes_v, labels_v, scores_v, masks_v] = outputs;

    let boxes = match boxes_v {
        Some(v) => v.try_extract_tensor::<f32>()?.1.to_vec(),
        None => return Err(anyhow!("el modelo no devolvió cajas")),
    };
    let scores = match scores_v {
        Some(v) => v.try_extract_tensor::<f32>()?.1.to_vec(),
        None => return Err(anyhow!("el modelo no devolvió puntuaciones")),
    };
    let labels = labels_v.and_then(extract_labels).unwrap_or_default();
    let masks = match masks_v {
        Some(v) => {
            let (shape, data) = v.try_extract_tensor::<f32>()?;
            let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
            if dims.len() >= 2 {
                let (h, w) = (dims[dims.len() - 2], dims[dims.len() - 1]);
                Some((data.to_vec(), w, h))
            } else {
                None
            }
        }
        None => None,
    };

    let num_boxes = boxes.len() / 4;
    let mut instances = Vec::new();

    for (idx, &score) in scores.iter().enumerate() {
        // NaN nunca pasa el umbral.
        if !(score >= params.confidence_threshold) {
            continue;
        }

        let category = labels
            .get(idx)
            .map(|&l| Category::from_class_index(l, classes))
            .unwrap_or(Category::Unknown);

        let bbox = if idx < num_boxes {
            let b = &boxes[idx * 4..idx * 4 + 4];
            lb.unletterbox_box(&BBox::new(b[0], b[1], b[2], b[3]))
        } else {
            warn!("Instancia {} sin caja asociada", idx);
            BBox::new(0.0, 0.0, 0.0, 0.0)
        };

        let mut instance = RawInstance::new(category, score, bbox);

        if let Some((data, w, h)) = &masks {
            let plane = w * h;
            if plane > 0 && (idx + 1) * plane <= data.len() {
                let slice = &data[idx * plane..(idx + 1) * plane];
                if let Some(mask) = mask_from_probabilities(slice, *w as u32, *h as u32) {
                    let resized = lb.mask_to_original(&mask);
                    instance = instance.with_mask(encode_mask(&resized)?);
                }
            }
        }

        instances.push(instance);
    }

    debug!("ONNX: {} candidatos, {} sobre el umbral", scores.len(), instances.len());
    Ok(instances)
}

impl LocalRuntime for OnnxSegEngine {
    fn infer(&self, image: &DynamicImage, params: &InferenceParams) -> Result<Vec<RawInstance>> {
        let [w, h] = self.input_size;
        let lb = letterbox(image, w, h);
        let input = lb.to_tensor(self.mean, self.std);

        let input_shape = vec![1, 3, h as i64, w as i64];
        let input_tensor = Value::from_array((input_shape, input.into_raw_vec_and_offset().0))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("lock de la sesión ONNX envenenado"))?;
        let outputs = session.run(ort::inputs![input_tensor])?;

        let slot = |i: usize| if i < outputs.len() { Some(&outputs[i]) } else { None };
        let outputs_by_position = [slot(0), slot(1), slot(2), slot(3)];
        parse_outputs(&self.classes, &outputs_by_position, &lb, params)
    }
}

fn extract_labels(value: &DynValue) -> Option<Vec<i64>> {
    if let Ok((_, data)) = value.try_extract_tensor::<i64>() {
        return Some(data.to_vec());
    }
    if let Ok((_, data)) = value.try_extract_tensor::<i32>() {
        return Some(data.iter().map(|&v| v as i64).collect());
    }
    if let Ok((_, data)) = value.try_extract_tensor::<f32>() {
        return Some(data.iter().map(|&v| v as i64).collect());
    }
    None
}
