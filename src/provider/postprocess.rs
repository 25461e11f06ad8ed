//! Image post-processing: collage heuristic and deterministic cover-fit.
use std::io::Cursor;

use image::imageops::FilterType;
use image::ImageOutputFormat;

use crate::error::{AppError, AppResult};

/// Threshold over the requested target beyond which a returned image is
/// suspected to be a multi-panel collage.
const COLLAGE_FACTOR: f64 = 1.8;

#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub png_bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub source_width: u32,
    pub source_height: u32,
}

/// Heuristic detector for providers that return multi-panel images despite
/// negative prompting. Never fails the call; callers record it in the debug
/// trace.
pub fn suspected_collage(width: u32, height: u32, target_w: u32, target_h: u32) -> bool {
    f64::from(width) > f64::from(target_w) * COLLAGE_FACTOR
        || f64::from(height) > f64::from(target_h) * COLLAGE_FACTOR
}

/// Decode, scale with "cover" semantics (preserve aspect, fill the target)
/// and center-crop to exactly `target_w x target_h`, re-encoded as PNG.
pub fn fit_cover(bytes: &[u8], target_w: u32, target_h: u32) -> AppResult<ProcessedImage> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| AppError::ImageProcessing(format!("decode failed: {}", e)))?;
    let source_width = img.width();
    let source_height = img.height();

    // resize_to_fill scales to cover the target and crops the overflow
    // centered, which is exactly the deterministic fit we want.
    let fitted = img.resize_to_fill(target_w, target_h, FilterType::Lanczos3);

    let mut out = Cursor::new(Vec::new());
    fitted
        .write_to(&mut out, ImageOutputFormat::Png)
        .map_err(|e| AppError::ImageProcessing(format!("encode failed: {}", e)))?;

    Ok(ProcessedImage {
        png_bytes: out.into_inner(),
        width: fitted.width(),
        height: fitted.height(),
        source_width,
        source_height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};

    fn png_of(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(
            width,
            height,
            image::Rgb([120, 40, 200]),
        ));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageOutputFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn collage_flag_fires_past_the_threshold() {
        assert!(suspected_collage(1024, 2304, 1024, 1280));
        assert!(suspected_collage(2048, 1024, 1024, 1024));
        assert!(!suspected_collage(1024, 1280, 1024, 1280));
        // 1.8x exactly is still acceptable.
        assert!(!suspected_collage(1843, 1280, 1024, 1280));
    }

    #[test]
    fn cover_fit_yields_exact_target_dimensions() {
        let processed = fit_cover(&png_of(640, 900), 320, 400).unwrap();
        assert_eq!(processed.width, 320);
        assert_eq!(processed.height, 400);
        assert_eq!(processed.source_width, 640);
        assert_eq!(processed.source_height, 900);
        assert!(image::load_from_memory(&processed.png_bytes).is_ok());
    }

    #[test]
    fn oversized_collage_is_cropped_not_rejected() {
        let processed = fit_cover(&png_of(512, 1152), 256, 320).unwrap();
        assert_eq!((processed.width, processed.height), (256, 320));
        assert!(suspected_collage(
            processed.source_width,
            processed.source_height,
            256,
            320
        ));
    }

    #[test]
    fn garbage_bytes_fail_decoding() {
        let err = fit_cover(b"not an image", 100, 100).unwrap_err();
        assert!(matches!(err, AppError::ImageProcessing(_)));
    }
}
