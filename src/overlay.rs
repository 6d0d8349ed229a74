//! Heatmap Overlay Compositing
//!
//! Turns a class-activation heatmap into a viewable image: the unit-interval
//! map is quantized to 8-bit, upscaled bilinearly to the source image's
//! resolution, pushed through a thermal colormap, and alpha-blended over the
//! source. The two serving endpoints use different blend weights and wire
//! formats, so both are explicit parameters here rather than baked in.

use std::io::Cursor;

use image::{imageops::FilterType, DynamicImage, GrayImage, Rgb, RgbImage};

use crate::gradcam::Heatmap;
use crate::utils::error::{LeafcamError, Result};

/// Blend weights for compositing a colorized heatmap over the source image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendWeights {
    /// Weight applied to the colorized heatmap
    pub heat: f32,
    /// Weight applied to the source image
    pub image: f32,
}

/// Equal-weight blend used by the JPEG overlay endpoint
pub const HEATMAP_BLEND: BlendWeights = BlendWeights {
    heat: 0.5,
    image: 0.5,
};

/// Image-dominant blend used by the PNG overlay endpoint
pub const GRADCAM_BLEND: BlendWeights = BlendWeights {
    heat: 0.4,
    image: 0.6,
};

/// Output encoding for the composited overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayFormat {
    Jpeg,
    Png,
}

impl OverlayFormat {
    /// MIME type for the encoded bytes
    pub fn content_type(&self) -> &'static str {
        match self {
            OverlayFormat::Jpeg => "image/jpeg",
            OverlayFormat::Png => "image/png",
        }
    }
}

/// Thermal ramp stops: activation position and RGB color.
///
/// Zero activation maps to black, so regions without signal contribute
/// nothing to the blend and a neutral heatmap leaves the source image
/// dimmed by exactly the image weight.
const COLOR_STOPS: [(f32, [f32; 3]); 5] = [
    (0.0, [0.0, 0.0, 0.0]),
    (0.25, [0.0, 0.0, 255.0]),
    (0.5, [0.0, 255.0, 255.0]),
    (0.75, [255.0, 255.0, 0.0]),
    (1.0, [255.0, 0.0, 0.0]),
];

fn lerp(a: f32, b: f32, t: f32) -> u8 {
    (a + (b - a) * t).round() as u8
}

/// Map a unit-interval activation value to its ramp color
fn colorize(t: f32) -> Rgb<u8> {
    let t = t.clamp(0.0, 1.0);

    for window in COLOR_STOPS.windows(2) {
        let (t0, c0) = window[0];
        let (t1, c1) = window[1];
        if t <= t1 {
            let frac = if t1 > t0 { (t - t0) / (t1 - t0) } else { 0.0 };
            return Rgb([
                lerp(c0[0], c1[0], frac),
                lerp(c0[1], c1[1], frac),
                lerp(c0[2], c1[2], frac),
            ]);
        }
    }

    let last = COLOR_STOPS[COLOR_STOPS.len() - 1].1;
    Rgb([last[0] as u8, last[1] as u8, last[2] as u8])
}

/// Upscale a heatmap to the target size and apply the colormap.
///
/// The map is quantized to 8-bit before the bilinear resize, matching the
/// usual uint8-then-resize visualization pipeline.
pub fn colorize_heatmap(heatmap: &Heatmap, width: u32, height: u32) -> RgbImage {
    let mut gray = GrayImage::new(heatmap.width as u32, heatmap.height as u32);
    for (x, y, pixel) in gray.enumerate_pixels_mut() {
        let value = heatmap.at(x as usize, y as usize);
        pixel[0] = (value.clamp(0.0, 1.0) * 255.0).round() as u8;
    }

    let resized = image::imageops::resize(&gray, width, height, FilterType::Triangle);

    let mut colored = RgbImage::new(width, height);
    for (x, y, pixel) in colored.enumerate_pixels_mut() {
        *pixel = colorize(resized.get_pixel(x, y)[0] as f32 / 255.0);
    }
    colored
}

/// Blend a colorized heatmap over the source image.
///
/// Each channel is `weights.heat * heat + weights.image * source`, clipped
/// to the valid 8-bit range. The two images must share dimensions.
pub fn blend(heat: &RgbImage, source: &RgbImage, weights: BlendWeights) -> Result<RgbImage> {
    if heat.dimensions() != source.dimensions() {
        return Err(LeafcamError::Inference(format!(
            "overlay size {:?} does not match source size {:?}",
            heat.dimensions(),
            source.dimensions()
        )));
    }

    let (width, height) = source.dimensions();
    let mut blended = RgbImage::new(width, height);

    for (x, y, pixel) in blended.enumerate_pixels_mut() {
        let h = heat.get_pixel(x, y);
        let s = source.get_pixel(x, y);
        for c in 0..3 {
            let value = weights.heat * h[c] as f32 + weights.image * s[c] as f32;
            pixel[c] = value.clamp(0.0, 255.0).round() as u8;
        }
    }

    Ok(blended)
}

/// Encode an RGB image into the requested wire format
pub fn encode(image: &RgbImage, format: OverlayFormat) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let target = match format {
        OverlayFormat::Jpeg => image::ImageFormat::Jpeg,
        OverlayFormat::Png => image::ImageFormat::Png,
    };

    DynamicImage::ImageRgb8(image.clone())
        .write_to(&mut Cursor::new(&mut buf), target)
        .map_err(|e| LeafcamError::Inference(format!("failed to encode overlay: {}", e)))?;

    Ok(buf)
}

/// Full compositing pipeline: colorize, upscale, blend, encode
pub fn compose(
    heatmap: &Heatmap,
    source: &RgbImage,
    weights: BlendWeights,
    format: OverlayFormat,
) -> Result<Vec<u8>> {
    let (width, height) = source.dimensions();
    let colored = colorize_heatmap(heatmap, width, height);
    let blended = blend(&colored, source, weights)?;
    encode(&blended, format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colorize_ramp_stops() {
        assert_eq!(colorize(0.0), Rgb([0, 0, 0]));
        assert_eq!(colorize(0.25), Rgb([0, 0, 255]));
        assert_eq!(colorize(0.5), Rgb([0, 255, 255]));
        assert_eq!(colorize(0.75), Rgb([255, 255, 0]));
        assert_eq!(colorize(1.0), Rgb([255, 0, 0]));
    }

    #[test]
    fn test_colorize_interpolates() {
        // Halfway between black and blue
        assert_eq!(colorize(0.125), Rgb([0, 0, 128]));
        // Out-of-range input clamps
        assert_eq!(colorize(-1.0), Rgb([0, 0, 0]));
        assert_eq!(colorize(2.0), Rgb([255, 0, 0]));
    }

    #[test]
    fn test_colorize_heatmap_dimensions() {
        let heatmap = Heatmap::neutral(2, 2);
        let colored = colorize_heatmap(&heatmap, 224, 224);
        assert_eq!(colored.dimensions(), (224, 224));
    }

    #[test]
    fn test_neutral_heatmap_blend_fractions() {
        // A neutral heatmap colorizes to black everywhere, so the blend keeps
        // exactly the image-weight fraction of the source intensities.
        let heatmap = Heatmap::neutral(2, 2);
        let source = RgbImage::from_pixel(8, 8, Rgb([100, 200, 40]));

        let colored = colorize_heatmap(&heatmap, 8, 8);
        assert!(colored.pixels().all(|p| *p == Rgb([0, 0, 0])));

        let half = blend(&colored, &source, HEATMAP_BLEND).unwrap();
        assert!(half.pixels().all(|p| *p == Rgb([50, 100, 20])));

        let dimmed = blend(&colored, &source, GRADCAM_BLEND).unwrap();
        assert!(dimmed.pixels().all(|p| *p == Rgb([60, 120, 24])));
    }

    #[test]
    fn test_blend_clips_to_byte_range() {
        let heat = RgbImage::from_pixel(2, 2, Rgb([255, 255, 255]));
        let source = RgbImage::from_pixel(2, 2, Rgb([200, 200, 200]));

        let weights = BlendWeights {
            heat: 1.0,
            image: 1.0,
        };
        let blended = blend(&heat, &source, weights).unwrap();
        assert!(blended.pixels().all(|p| *p == Rgb([255, 255, 255])));
    }

    #[test]
    fn test_blend_rejects_size_mismatch() {
        let heat = RgbImage::new(4, 4);
        let source = RgbImage::new(8, 8);
        assert!(blend(&heat, &source, HEATMAP_BLEND).is_err());
    }

    #[test]
    fn test_compose_produces_decodable_png() {
        let heatmap = Heatmap {
            values: vec![0.0, 0.5, 0.5, 1.0],
            height: 2,
            width: 2,
            degenerate: false,
        };
        let source = RgbImage::from_pixel(16, 16, Rgb([120, 80, 40]));

        let bytes = compose(&heatmap, &source, GRADCAM_BLEND, OverlayFormat::Png).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.width(), 16);
        assert_eq!(decoded.height(), 16);
    }

    #[test]
    fn test_compose_produces_decodable_jpeg() {
        let heatmap = Heatmap {
            values: vec![1.0, 0.0, 0.0, 1.0],
            height: 2,
            width: 2,
            degenerate: false,
        };
        let source = RgbImage::from_pixel(16, 16, Rgb([0, 150, 0]));

        let bytes = compose(&heatmap, &source, HEATMAP_BLEND, OverlayFormat::Jpeg).unwrap();
        let format = image::guess_format(&bytes).unwrap();
        assert_eq!(format, image::ImageFormat::Jpeg);
    }

    #[test]
    fn test_content_types() {
        assert_eq!(OverlayFormat::Jpeg.content_type(), "image/jpeg");
        assert_eq!(OverlayFormat::Png.content_type(), "image/png");
    }
}
