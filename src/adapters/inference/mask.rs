use anyhow::Result;
use base64::{prelude::BASE64_STANDARD, Engine};
use image::{GrayImage, ImageFormat, Luma};
use std::io::Cursor;

/// Máscara binaria -> PNG en base64.
pub fn encode_mask(mask: &GrayImage) -> Result<String> {
    let mut buf = Vec::new();
    mask.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(BASE64_STANDARD.encode(buf))
}

pub fn decode_mask(encoded: &str) -> Result<GrayImage> {
    let bytes = BASE64_STANDARD.decode(encoded.trim())?;
    Ok(image::load_from_memory(&bytes)?.to_luma8())
}

/// Binariza probabilidades (H*W, fila mayor) con umbral 0.5.
pub fn mask_from_probabilities(data: &[f32], width: u32, height: u32) -> Option<GrayImage> {
    if data.len() != (width as usize) * (height as usize) {
        return None;
    }
    Some(GrayImage::from_fn(width, height, |x, y| {
        let v = data[y as usize * width as usize + x as usize];
        if v > 0.5 { Luma([255]) } else { Luma([0]) }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_mask_decodes_to_same_pixels() {
        let mask = GrayImage::from_fn(8, 4, |x, _| if x < 4 { Luma([255]) } else { Luma([0]) });
        let back = decode_mask(&encode_mask(&mask).unwrap()).unwrap();
        assert_eq!(back, mask);
    }

    #[test]
    fn probabilities_are_binarized() {
        let m = mask_from_probabilities(&[0.1, 0.6, 0.5, 0.9], 2, 2).unwrap();
        assert_eq!(m.as_raw(), &vec![0, 255, 0, 255]);
        assert!(mask_from_probabilities(&[0.1, 0.2], 2, 2).is_none());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(decode_mask("not base64 !!").is_err());
    }
}
