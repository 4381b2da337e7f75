//! Preview normalization.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

use crate::error::{Error, Result};

/// Decode `bytes` (PNG, JPEG, WebP or GIF), shrink to at most `max_width`
/// pixels wide and re-encode as JPEG.
///
/// Images already narrower than `max_width` keep their size. Transparency
/// is flattened.
///
/// # Errors
///
/// Returns [`Error::Transcode`] if the bytes are not a decodable image or
/// encoding fails.
pub fn transcode(bytes: &[u8], max_width: u32, quality: u8) -> Result<Vec<u8>> {
    let img = image::load_from_memory(bytes).map_err(|e| Error::Transcode(e.to_string()))?;

    let (width, height) = img.dimensions();
    let (target_w, target_h) = scaled_dimensions(width, height, max_width);
    let img = if (target_w, target_h) == (width, height) {
        img
    } else {
        img.resize_exact(target_w, target_h, FilterType::Lanczos3)
    };

    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut buf = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100)))
        .map_err(|e| Error::Transcode(e.to_string()))?;

    Ok(buf)
}

/// Target size for a `width` x `height` image bounded to `max_width`.
///
/// Height is rounded to the nearest pixel and never drops below 1.
#[must_use]
pub fn scaled_dimensions(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width <= max_width || width == 0 {
        return (width, height);
    }

    let scaled = (u64::from(height) * u64::from(max_width) + u64::from(width) / 2) / u64::from(width);
    let scaled = u32::try_from(scaled).unwrap_or(u32::MAX).max(1);
    (max_width, scaled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode(img: &DynamicImage, format: image::ImageFormat) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
        buf
    }

    fn checkerboard(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(image::RgbImage::from_fn(width, height, |x, y| {
            if (x + y) % 2 == 0 {
                image::Rgb([255, 0, 0])
            } else {
                image::Rgb([0, 0, 255])
            }
        }))
    }

    #[test]
    fn test_scaled_dimensions() {
        assert_eq!(scaled_dimensions(1920, 1080, 640), (640, 360));
        assert_eq!(scaled_dimensions(641, 3, 640), (640, 3));
        assert_eq!(scaled_dimensions(5000, 1, 640), (640, 1));
        assert_eq!(scaled_dimensions(320, 200, 640), (320, 200));
        assert_eq!(scaled_dimensions(640, 480, 640), (640, 480));
    }

    #[test]
    fn test_wide_png_is_shrunk() {
        let png = encode(&checkerboard(1280, 720), image::ImageFormat::Png);
        let jpeg = transcode(&png, 640, 80).unwrap();

        assert_eq!(image::guess_format(&jpeg).unwrap(), image::ImageFormat::Jpeg);
        let out = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(out.dimensions(), (640, 360));
    }

    #[test]
    fn test_small_image_is_not_upscaled() {
        let png = encode(&checkerboard(100, 50), image::ImageFormat::Png);
        let out = image::load_from_memory(&transcode(&png, 640, 80).unwrap()).unwrap();
        assert_eq!(out.dimensions(), (100, 50));
    }

    #[test]
    fn test_alpha_is_flattened() {
        let rgba = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            10,
            10,
            image::Rgba([0, 255, 0, 128]),
        ));
        let png = encode(&rgba, image::ImageFormat::Png);
        assert!(transcode(&png, 640, 80).is_ok());
    }

    #[test]
    fn test_garbage_is_rejected() {
        let err = transcode(b"definitely not an image", 640, 80).unwrap_err();
        assert!(matches!(err, Error::Transcode(_)));
    }
}
