//! Image decoding, bounding, annotation, and JPEG encoding.
//!
//! Everything here is synchronous and CPU-bound; callers run it on
//! `tokio::task::spawn_blocking`.

use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use thiserror::Error;

use hocskin_core::Category;

use super::detection::Detection;

/// JPEG quality for stored result images.
pub const JPEG_QUALITY: u8 = 85;

/// Outline thickness of detection boxes, in pixels.
pub const BOX_LINE_WIDTH: u32 = 2;

/// Errors raised while turning uploaded bytes into an analyzable image.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("data URL has no payload")]
    MissingPayload,

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("{0}")]
    Decode(#[from] image::ImageError),
}

/// Extract and decode the payload of a `data:image/...;base64,...` URL.
///
/// Everything up to the first comma is the header and is ignored.
///
/// # Errors
///
/// Returns `ImageError::MissingPayload` when there is no comma or the payload
/// is empty, or `ImageError::Base64` when the payload does not decode.
pub fn decode_data_url(data_url: &str) -> Result<Vec<u8>, ImageError> {
    let (_, payload) = data_url
        .split_once(',')
        .ok_or(ImageError::MissingPayload)?;
    let payload = payload.trim();
    if payload.is_empty() {
        return Err(ImageError::MissingPayload);
    }
    Ok(STANDARD.decode(payload)?)
}

/// Decode any supported image format into 8-bit RGB.
///
/// # Errors
///
/// Returns `ImageError::Decode` if the bytes are not a readable image.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, ImageError> {
    Ok(image::load_from_memory(bytes)?.to_rgb8())
}

/// Shrink an image so neither edge exceeds `max_dim`, keeping its aspect
/// ratio. Images already inside the bound are returned untouched.
#[must_use]
pub fn bound_to(image: RgbImage, max_dim: u32) -> RgbImage {
    if image.width() <= max_dim && image.height() <= max_dim {
        return image;
    }
    DynamicImage::ImageRgb8(image)
        .resize(max_dim, max_dim, FilterType::Lanczos3)
        .to_rgb8()
}

/// Encode an RGB image as JPEG.
///
/// # Errors
///
/// Returns `ImageError::Decode` if the encoder fails.
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, ImageError> {
    let mut buffer = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buffer, quality).encode_image(image)?;
    Ok(buffer.into_inner())
}

/// Outline color for a condition category.
#[must_use]
pub const fn box_color(category: Category) -> Rgb<u8> {
    match category {
        Category::Acne => Rgb([231, 76, 60]),
        Category::Wrinkle => Rgb([52, 152, 219]),
        Category::Eyebag => Rgb([155, 89, 182]),
        Category::Redness => Rgb([230, 126, 34]),
    }
}

/// Draw hollow boxes for `detections` onto `image` in the category's color.
///
/// Coordinates are clamped to the image; degenerate boxes still get a
/// one-pixel outline.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)] // pixel coordinates fit in i32 after clamping
pub fn draw_detections(image: &mut RgbImage, category: Category, detections: &[Detection]) {
    let (width, height) = (image.width() as i32, image.height() as i32);
    if width == 0 || height == 0 {
        return;
    }
    let color = box_color(category);

    for detection in detections {
        let x1 = detection.x1.round() as i32;
        let y1 = detection.y1.round() as i32;
        let x2 = detection.x2.round() as i32;
        let y2 = detection.y2.round() as i32;

        let x_min = x1.min(x2).clamp(0, width - 1);
        let y_min = y1.min(y2).clamp(0, height - 1);
        let x_max = x1.max(x2).clamp(0, width);
        let y_max = y1.max(y2).clamp(0, height);
        let box_width = (x_max - x_min).max(1) as u32;
        let box_height = (y_max - y_min).max(1) as u32;

        draw_hollow_rect_mut(
            image,
            Rect::at(x_min, y_min).of_size(box_width, box_height),
            color,
        );

        let insets = (BOX_LINE_WIDTH as i32)
            .min(box_width as i32 / 2)
            .min(box_height as i32 / 2);
        for inset in 1..insets {
            let step = 2 * inset as u32;
            let inner = Rect::at(x_min + inset, y_min + inset).of_size(
                box_width.saturating_sub(step).max(1),
                box_height.saturating_sub(step).max(1),
            );
            draw_hollow_rect_mut(image, inner, color);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn detection(x1: f32, y1: f32, x2: f32, y2: f32) -> Detection {
        Detection {
            x1,
            y1,
            x2,
            y2,
            confidence: 0.9,
            label: None,
        }
    }

    fn blank(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([255, 255, 255]))
    }

    #[test]
    fn test_decode_data_url() {
        let encoded = format!("data:image/png;base64,{}", STANDARD.encode(b"hello"));
        assert_eq!(decode_data_url(&encoded).unwrap(), b"hello");
    }

    #[test]
    fn test_decode_data_url_without_comma() {
        assert!(matches!(
            decode_data_url("data:image/png;base64"),
            Err(ImageError::MissingPayload)
        ));
        assert!(matches!(
            decode_data_url("data:image/png;base64,"),
            Err(ImageError::MissingPayload)
        ));
    }

    #[test]
    fn test_decode_data_url_bad_base64() {
        assert!(matches!(
            decode_data_url("data:image/png;base64,!!!"),
            Err(ImageError::Base64(_))
        ));
    }

    #[test]
    fn test_decode_image_rejects_garbage() {
        assert!(matches!(
            decode_image(b"definitely not an image"),
            Err(ImageError::Decode(_))
        ));
    }

    #[test]
    fn test_jpeg_decodes_back() {
        let jpeg = encode_jpeg(&blank(32, 16), JPEG_QUALITY).unwrap();
        let decoded = decode_image(&jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (32, 16));
    }

    #[test]
    fn test_bound_shrinks_keeping_aspect() {
        let bounded = bound_to(blank(800, 400), 400);
        assert_eq!(bounded.dimensions(), (400, 200));

        let bounded = bound_to(blank(300, 900), 400);
        assert_eq!(bounded.height(), 400);
        assert!(bounded.width() <= 134 && bounded.width() >= 133);
    }

    #[test]
    fn test_bound_never_enlarges() {
        let bounded = bound_to(blank(120, 80), 400);
        assert_eq!(bounded.dimensions(), (120, 80));
    }

    #[test]
    fn test_draw_detections_outlines_box() {
        let mut image = blank(50, 50);
        draw_detections(&mut image, Category::Acne, &[detection(10.0, 10.0, 30.0, 30.0)]);

        let color = box_color(Category::Acne);
        assert_eq!(*image.get_pixel(10, 10), color);
        assert_eq!(*image.get_pixel(11, 11), color);
        assert_eq!(*image.get_pixel(20, 20), Rgb([255, 255, 255]));
    }

    #[test]
    fn test_draw_detections_clamps_out_of_bounds() {
        let mut image = blank(20, 20);
        draw_detections(
            &mut image,
            Category::Redness,
            &[detection(-15.0, -5.0, 500.0, 500.0), detection(40.0, 40.0, 60.0, 60.0)],
        );
        assert_eq!(*image.get_pixel(0, 0), box_color(Category::Redness));
    }

    #[test]
    fn test_colors_are_distinct() {
        let colors: Vec<_> = Category::ALL.iter().map(|c| box_color(*c)).collect();
        for (i, a) in colors.iter().enumerate() {
            for b in &colors[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
