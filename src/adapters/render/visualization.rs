use anyhow::Result;
use async_trait::async_trait;
use image::{imageops, imageops::FilterType, Rgb, RgbImage};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use uuid::Uuid;

use crate::adapters::inference::mask::decode_mask;
use crate::application::ports::VisualizationPort;
use crate::domain::detection::Category;
use crate::domain::result::{DetectionResult, SegmentationMask, Visualization};

const FALLBACK_SIZE: u32 = 512;
const MASK_ON: u8 = 128;

pub fn category_color(category: Category) -> [u8; 3] {
    match category {
        Category::Observation => [0, 255, 0], // verde
        Category::Surgery => [255, 0, 0],     // rojo
        Category::Unknown => [255, 255, 0],   // amarillo
    }
}

/// Superpone las máscaras sobre la imagen original y guarda cada máscara por separado.
pub struct FsVisualizer {
    directory: PathBuf,
    url_prefix: String,
}

impl FsVisualizer {
    pub fn new(directory: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            url_prefix: url_prefix.into(),
        }
    }

    fn render_blocking(&self, source: &Path, masks: &[SegmentationMask]) -> Result<Visualization> {
        std::fs::create_dir_all(&self.directory)?;

        let mut overlay = match image::open(source) {
            Ok(img) => img.to_rgb8(),
            Err(e) => {
                error!("No se pudo abrir {}: {}", source.display(), e);
                RgbImage::new(FALLBACK_SIZE, FALLBACK_SIZE)
            }
        };
        let (width, height) = overlay.dimensions();

        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let short = Uuid::new_v4().simple().to_string();
        let short = &short[..8];

        let mut mask_urls = Vec::with_capacity(masks.len());
        for (idx, seg) in masks.iter().enumerate() {
            let mask = imageops::resize(&decode_mask(&seg.mask)?, width, height, FilterType::Nearest);
            blend_mask(&mut overlay, &mask, category_color(seg.category));

            let mask_filename = format!("mask_{}_{}_{}.png", stamp, short, idx);
            mask.save(self.directory.join(&mask_filename))?;
            mask_urls.push(format!("{}/{}", self.url_prefix, mask_filename));
        }

        let vis_filename = format!("segmentation_{}_{}.jpg", stamp, short);
        overlay.save(self.directory.join(&vis_filename))?;

        Ok(Visualization {
            url: format!("{}/{}", self.url_prefix, vis_filename),
            mask_urls,
        })
    }
}

/// Mezcla al 50 % el color de la categoría en los píxeles activos de la máscara.
pub fn blend_mask(image: &mut RgbImage, mask: &image::GrayImage, color: [u8; 3]) {
    for (x, y, m) in mask.enumerate_pixels() {
        if m[0] <= MASK_ON || x >= image.width() || y >= image.height() {
            continue;
        }
        let p = image.get_pixel_mut(x, y);
        let blended = [
            ((p[0] as u16 + color[0] as u16) / 2) as u8,
            ((p[1] as u16 + color[1] as u16) / 2) as u8,
            ((p[2] as u16 + color[2] as u16) / 2) as u8,
        ];
        *p = Rgb(blended);
    }
}

#[async_trait]
impl VisualizationPort for FsVisualizer {
    async fn render(&self, source: PathBuf, result: &DetectionResult) -> Visualization {
        let renderer = FsVisualizer::new(self.directory.clone(), self.url_prefix.clone());
        let masks = result.segmentation_masks.clone();

        let outcome = tokio::task::spawn_blocking(move || renderer.render_blocking(&source, &masks)).await;
        match outcome {
            Ok(Ok(vis)) => {
                info!("Visualización generada: {}", vis.url);
                vis
            }
            Ok(Err(e)) => {
                error!("❌ Error creando la visualización: {:?}", e);
                Visualization::default()
            }
            Err(e) => {
                error!("❌ Tarea de visualización abortada: {}", e);
                Visualization::default()
            }
        }
    }
}
