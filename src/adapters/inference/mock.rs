use image::{GrayImage, Luma};
use imageproc::drawing::draw_filled_ellipse_mut;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

use super::mask::encode_mask;
use crate::domain::detection::{BBox, Category, RawInstance};

pub const MOCK_MODEL_VERSION: &str = "v1.0.0-demo";

/// Generador aleatorio de 0 a 3 instancias. Es el respaldo final: no falla.
pub struct MockEngine {
    rng: Mutex<StdRng>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn generate(&self, width: u32, height: u32, threshold: f32) -> Vec<RawInstance> {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let (w, h) = (width.max(1) as f32, height.max(1) as f32);
        let count = rng.random_range(0..=3);
        let mut instances = Vec::with_capacity(count);

        for _ in 0..count {
            let category = if rng.random_bool(0.5) {
                Category::Observation
            } else {
                Category::Surgery
            };
            let score: f32 = rng.random_range(0.7..0.99);

            let x1 = rng.random_range(0.1..0.4) * w;
            let y1 = rng.random_range(0.1..0.4) * h;
            let x2 = rng.random_range(0.5..0.9) * w;
            let y2 = rng.random_range(0.5..0.9) * h;
            let bbox = BBox::new(x1, y1, x2, y2);

            if score < threshold {
                continue;
            }

            let mut instance = RawInstance::new(category, score, bbox);
            if let Some(mask) = ellipse_mask(width, height, &bbox) {
                instance = instance.with_mask(mask);
            }
            instances.push(instance);
        }

        instances
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn ellipse_mask(width: u32, height: u32, bbox: &BBox) -> Option<String> {
    if width == 0 || height == 0 {
        return None;
    }
    let mut mask = GrayImage::new(width, height);
    let center = (
        ((bbox.x1 + bbox.x2) / 2.0) as i32,
        ((bbox.y1 + bbox.y2) / 2.0) as i32,
    );
    let rx = ((bbox.x2 - bbox.x1) / 2.0).max(1.0) as i32;
    let ry = ((bbox.y2 - bbox.y1) / 2.0).max(1.0) as i32;
    draw_filled_ellipse_mut(&mut mask, center, rx, ry, Luma([255u8]));
    encode_mask(&mask).ok()
}
