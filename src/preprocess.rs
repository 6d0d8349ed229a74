//! Image Preprocessing Module
//!
//! Turns raw uploaded bytes into the model input tensor. The pipeline is:
//! decode, resize to 224x224, scale pixel values into [0, 1], and lay the
//! result out as a `[1, 3, 224, 224]` CHW tensor with a leading batch axis.
//!
//! The intermediate RGB image is exposed separately so the visualization
//! endpoints can reuse it as the overlay base without decoding twice.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use image::{imageops::FilterType, DynamicImage, RgbImage};

use crate::utils::error::Result;

/// Model input width and height in pixels
pub const IMAGE_SIZE: usize = 224;

/// Decode raw image bytes and resize to the model's input resolution.
///
/// Any byte stream the `image` crate cannot parse (or an unsupported format)
/// surfaces as [`crate::LeafcamError::Decode`], which callers map to a client
/// error rather than a server fault.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage> {
    let image = image::load_from_memory(bytes)?;
    Ok(resize_image(&image, IMAGE_SIZE as u32))
}

/// Resize an image to square target dimensions, discarding the alpha channel
fn resize_image(image: &DynamicImage, size: u32) -> RgbImage {
    image.resize_exact(size, size, FilterType::Lanczos3).to_rgb8()
}

/// Normalize an RGB image to a flat vector with values in [0, 1]
/// Returns CHW layout: [C, H, W] flattened
pub fn normalize_image(rgb: &RgbImage) -> Vec<f32> {
    let (width, height) = rgb.dimensions();
    let num_pixels = (width * height) as usize;

    // Pre-allocate for CHW layout
    let mut normalized = vec![0.0f32; 3 * num_pixels];

    for (i, pixel) in rgb.pixels().enumerate() {
        // CHW layout: all R values, then all G values, then all B values
        normalized[i] = pixel[0] as f32 / 255.0;
        normalized[num_pixels + i] = pixel[1] as f32 / 255.0;
        normalized[2 * num_pixels + i] = pixel[2] as f32 / 255.0;
    }

    normalized
}

/// Convert a decoded RGB image into a `[1, C, H, W]` input tensor
pub fn to_input_tensor<B: Backend>(rgb: &RgbImage, device: &B::Device) -> Tensor<B, 4> {
    let height = rgb.height() as usize;
    let width = rgb.width() as usize;
    let pixels = normalize_image(rgb);

    Tensor::<B, 1>::from_floats(pixels.as_slice(), device).reshape([1, 3, height, width])
}

/// Decode, resize and normalize raw bytes into a model input tensor
pub fn bytes_to_tensor<B: Backend>(bytes: &[u8], device: &B::Device) -> Result<Tensor<B, 4>> {
    let rgb = decode_image(bytes)?;
    Ok(to_input_tensor::<B>(&rgb, device))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::LeafcamError;
    use burn_ndarray::NdArray;
    use image::Rgb;
    use std::io::Cursor;

    type TestBackend = NdArray;

    fn encode_png(rgb: &RgbImage) -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(rgb.clone())
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn test_decode_resizes_to_model_input() {
        let src = RgbImage::from_pixel(100, 60, Rgb([10, 20, 30]));
        let bytes = encode_png(&src);

        let decoded = decode_image(&bytes).unwrap();
        assert_eq!(decoded.width(), IMAGE_SIZE as u32);
        assert_eq!(decoded.height(), IMAGE_SIZE as u32);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = decode_image(b"definitely not an image").unwrap_err();
        assert!(matches!(err, LeafcamError::Decode(_)));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_normalize_range_and_layout() {
        // 2x1 image: left pixel pure red, right pixel pure blue
        let mut rgb = RgbImage::new(2, 1);
        rgb.put_pixel(0, 0, Rgb([255, 0, 0]));
        rgb.put_pixel(1, 0, Rgb([0, 0, 255]));

        let normalized = normalize_image(&rgb);
        assert_eq!(normalized.len(), 3 * 2);

        // CHW: [r0, r1, g0, g1, b0, b1]
        assert_eq!(normalized[0], 1.0);
        assert_eq!(normalized[1], 0.0);
        assert_eq!(normalized[2], 0.0);
        assert_eq!(normalized[3], 0.0);
        assert_eq!(normalized[4], 0.0);
        assert_eq!(normalized[5], 1.0);

        assert!(normalized.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_tensor_shape() {
        let src = RgbImage::from_pixel(50, 50, Rgb([128, 128, 128]));
        let bytes = encode_png(&src);

        let device = Default::default();
        let tensor = bytes_to_tensor::<TestBackend>(&bytes, &device).unwrap();
        assert_eq!(tensor.dims(), [1, 3, IMAGE_SIZE, IMAGE_SIZE]);
    }

    #[test]
    fn test_tensor_values_scaled() {
        let rgb = RgbImage::from_pixel(4, 4, Rgb([255, 0, 51]));

        let device = Default::default();
        let tensor = to_input_tensor::<TestBackend>(&rgb, &device);
        let values = tensor.into_data().to_vec::<f32>().unwrap();

        // First channel all 1.0, second all 0.0, third all 0.2
        assert!(values[..16].iter().all(|&v| (v - 1.0).abs() < 1e-6));
        assert!(values[16..32].iter().all(|&v| v.abs() < 1e-6));
        assert!(values[32..].iter().all(|&v| (v - 0.2).abs() < 1e-3));
    }
}
