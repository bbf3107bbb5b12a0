use anyhow::Result;
use base64::{prelude::BASE64_STANDARD, Engine};
use image::{imageops, imageops::FilterType, DynamicImage, GrayImage, ImageFormat, Rgb, RgbImage};
use ndarray::Array4;
use std::io::Cursor;

use crate::domain::detection::BBox;

/// Imagen redimensionada conservando la relación de aspecto y centrada sobre
/// un lienzo negro del tamaño de entrada del modelo.
pub struct Letterboxed {
    pub image: RgbImage,
    pub scale: f32,
    pub pad_x: u32,
    pub pad_y: u32,
    pub content_w: u32,
    pub content_h: u32,
    pub orig_w: u32,
    pub orig_h: u32,
}

pub fn letterbox(image: &DynamicImage, target_w: u32, target_h: u32) -> Letterboxed {
    let rgb = image.to_rgb8();
    let (orig_w, orig_h) = rgb.dimensions();
    let mut canvas = RgbImage::from_pixel(target_w, target_h, Rgb([0, 0, 0]));

    if orig_w == 0 || orig_h == 0 {
        return Letterboxed {
            image: canvas,
            scale: 1.0,
            pad_x: 0,
            pad_y: 0,
            content_w: 0,
            content_h: 0,
            orig_w,
            orig_h,
        };
    }

    let scale = (target_w as f32 / orig_w as f32).min(target_h as f32 / orig_h as f32);
    let content_w = ((orig_w as f32 * scale).round() as u32).clamp(1, target_w);
    let content_h = ((orig_h as f32 * scale).round() as u32).clamp(1, target_h);

    let resized = imageops::resize(&rgb, content_w, content_h, FilterType::Lanczos3);
    let pad_x = (target_w - content_w) / 2;
    let pad_y = (target_h - content_h) / 2;
    imageops::overlay(&mut canvas, &resized, pad_x as i64, pad_y as i64);

    Letterboxed {
        image: canvas,
        scale,
        pad_x,
        pad_y,
        content_w,
        content_h,
        orig_w,
        orig_h,
    }
}

impl Letterboxed {
    /// Tensor NCHW en [0,1], estandarizado por canal si hay media/desviación.
    pub fn to_tensor(&self, mean: Option<[f32; 3]>, std: Option<[f32; 3]>) -> Array4<f32> {
        let (w, h) = self.image.dimensions();
        let mut input = Array4::<f32>::zeros((1, 3, h as usize, w as usize));
        for (x, y, pixel) in self.image.enumerate_pixels() {
            for c in 0..3 {
                let mut v = pixel[c] as f32 / 255.0;
                if let (Some(m), Some(s)) = (mean, std) {
                    if s[c] != 0.0 {
                        v = (v - m[c]) / s[c];
                    }
                }
                input[[0, c, y as usize, x as usize]] = v;
            }
        }
        input
    }

    /// Punto del espacio del modelo a la imagen original, recortado a sus límites.
    pub fn to_original(&self, x: f32, y: f32) -> (f32, f32) {
        let ox = (x - self.pad_x as f32) / self.scale;
        let oy = (y - self.pad_y as f32) / self.scale;
        (
            ox.clamp(0.0, self.orig_w as f32),
            oy.clamp(0.0, self.orig_h as f32),
        )
    }

    pub fn unletterbox_box(&self, bbox: &BBox) -> BBox {
        let (x1, y1) = self.to_original(bbox.x1, bbox.y1);
        let (x2, y2) = self.to_original(bbox.x2, bbox.y2);
        BBox::new(x1, y1, x2, y2)
    }

    /// Lleva una máscara al tamaño original. Si la máscara tiene el tamaño de
    /// entrada se recorta primero la zona útil (sin relleno).
    pub fn mask_to_original(&self, mask: &GrayImage) -> GrayImage {
        if self.orig_w == 0 || self.orig_h == 0 {
            return GrayImage::new(self.orig_w, self.orig_h);
        }
        let (iw, ih) = self.image.dimensions();
        let region = if mask.dimensions() == (iw, ih) && self.content_w > 0 && self.content_h > 0 {
            imageops::crop_imm(mask, self.pad_x, self.pad_y, self.content_w, self.content_h).to_image()
        } else {
            mask.clone()
        };
        imageops::resize(&region, self.orig_w, self.orig_h, FilterType::Nearest)
    }

    pub fn to_png_base64(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.image.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
        Ok(BASE64_STANDARD.encode(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([255, 255, 255])))
    }

    #[test]
    fn wide_image_is_padded_vertically() {
        let lb = letterbox(&solid(200, 100), 512, 512);
        assert!((lb.scale - 2.56).abs() < 1e-6);
        assert_eq!((lb.content_w, lb.content_h), (512, 256));
        assert_eq!((lb.pad_x, lb.pad_y), (0, 128));
        assert_eq!(lb.image.get_pixel(10, 10), &Rgb([0, 0, 0]));
        assert_eq!(lb.image.get_pixel(256, 256), &Rgb([255, 255, 255]));
    }

    #[test]
    fn boxes_map_back_to_original_space() {
        let lb = letterbox(&solid(200, 100), 512, 512);
        let model_box = BBox::new(25.6, 128.0 + 25.6, 256.0, 128.0 + 128.0);
        let b = lb.unletterbox_box(&model_box);
        assert!((b.x1 - 10.0).abs() < 1e-3);
        assert!((b.y1 - 10.0).abs() < 1e-3);
        assert!((b.x2 - 100.0).abs() < 1e-3);
        assert!((b.y2 - 50.0).abs() < 1e-3);
    }

    #[test]
    fn points_in_padding_are_clamped() {
        let lb = letterbox(&solid(200, 100), 512, 512);
        assert_eq!(lb.to_original(0.0, 0.0), (0.0, 0.0));
        let (x, y) = lb.to_original(512.0, 512.0);
        assert!((x - 200.0).abs() < 1e-3);
        assert_eq!(y, 100.0);
    }

    #[test]
    fn tensor_is_nchw_and_standardized() {
        let lb = letterbox(&solid(4, 4), 4, 4);
        let plain = lb.to_tensor(None, None);
        assert_eq!(plain.shape(), &[1, 3, 4, 4]);
        assert_eq!(plain[[0, 1, 2, 2]], 1.0);

        let std = lb.to_tensor(Some([0.5, 0.5, 0.5]), Some([0.25, 0.25, 0.25]));
        assert!((std[[0, 0, 0, 0]] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn full_size_mask_is_cropped_before_resizing() {
        let lb = letterbox(&solid(200, 100), 512, 512);
        let mut mask = GrayImage::new(512, 512);
        // Sólo la banda de relleno superior queda marcada.
        for y in 0..128 {
            for x in 0..512 {
                mask.put_pixel(x, y, image::Luma([255]));
            }
        }
        let out = lb.mask_to_original(&mask);
        assert_eq!(out.dimensions(), (200, 100));
        assert!(out.pixels().all(|p| p[0] == 0));
    }
}
