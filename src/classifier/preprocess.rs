//! Image preprocessing for the identity model.
//!
//! Stored step-pattern images are 256x256; the model expects 224x224 NCHW
//! float32 with ImageNet channel statistics. Deterministic: byte-identical
//! input always yields the same tensor.

use crate::error::ClassifierError;
use image::imageops::FilterType;
use ndarray::Array4;

/// Spatial resolution the model expects on both axes
pub const MODEL_INPUT_SIZE: u32 = 224;

/// ImageNet per-channel mean (RGB)
const CHANNEL_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// ImageNet per-channel standard deviation (RGB)
const CHANNEL_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Model input tensor, shape [1, 3, 224, 224]
pub type InputTensor = Array4<f32>;

/// Decode raw image bytes and convert them into the model's input tensor.
///
/// Resizes with bilinear interpolation, scales pixels to [0, 1], then applies
/// the fixed per-channel normalization.
pub fn preprocess(bytes: &[u8]) -> Result<InputTensor, ClassifierError> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| ClassifierError::InvalidImage(format!("decode failed: {}", e)))?;

    if decoded.width() == 0 || decoded.height() == 0 {
        return Err(ClassifierError::InvalidImage(
            "image has zero spatial dimensions".to_string(),
        ));
    }

    let resized = decoded
        .resize_exact(MODEL_INPUT_SIZE, MODEL_INPUT_SIZE, FilterType::Triangle)
        .to_rgb8();

    let side = MODEL_INPUT_SIZE as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, side, side));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            let scaled = pixel[c] as f32 / 255.0;
            tensor[[0, c, y as usize, x as usize]] = (scaled - CHANNEL_MEAN[c]) / CHANNEL_STD[c];
        }
    }

    Ok(tensor)
}
