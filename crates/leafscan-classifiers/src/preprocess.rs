//! Image preprocessing for model input
//!
//! Each model gets its own preprocessor: the gate expects ImageNet-normalised
//! 224x224 input, the disease model expects 150x150 pixels scaled to [0, 1].

use crate::classifier::inference_error;
use candle_core::{DType, Device, Tensor};
use image::imageops::{self, FilterType};
use image::RgbImage;
use leafscan_core::Result;
use serde::{Deserialize, Serialize};

/// ImageNet channel means
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNet channel standard deviations
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Pixel normalisation applied after scaling to [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// `x / 255`
    UnitRange,
    /// `(x / 255 - mean) / std` per channel
    MeanStd { mean: [f32; 3], std: [f32; 3] },
}

impl Normalization {
    pub fn imagenet() -> Self {
        Self::MeanStd {
            mean: IMAGENET_MEAN,
            std: IMAGENET_STD,
        }
    }
}

/// Resizes an RGB image and turns it into a `(1, 3, size, size)` f32 tensor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preprocessor {
    size: u32,
    normalization: Normalization,
}

impl Preprocessor {
    pub fn new(size: u32, normalization: Normalization) -> Self {
        Self {
            size,
            normalization,
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    /// Stretch to `size x size` without preserving aspect ratio
    pub fn resize(&self, image: &RgbImage) -> RgbImage {
        if image.dimensions() == (self.size, self.size) {
            return image.clone();
        }
        imageops::resize(image, self.size, self.size, FilterType::CatmullRom)
    }

    /// Produce the batched, normalised input tensor
    pub fn to_tensor(&self, image: &RgbImage, device: &Device) -> Result<Tensor> {
        let resized = self.resize(image);
        let side = self.size as usize;

        let hwc = Tensor::from_vec(resized.into_raw(), (side, side, 3), device)
            .map_err(inference_error)?;
        let chw = hwc
            .permute((2, 0, 1))
            .and_then(|t| t.to_dtype(DType::F32))
            .and_then(|t| t / 255.0)
            .map_err(inference_error)?;

        let normalized = match self.normalization {
            Normalization::UnitRange => chw,
            Normalization::MeanStd { mean, std } => {
                let mean = Tensor::new(&mean, device)
                    .and_then(|t| t.reshape((3, 1, 1)))
                    .map_err(inference_error)?;
                let std = Tensor::new(&std, device)
                    .and_then(|t| t.reshape((3, 1, 1)))
                    .map_err(inference_error)?;
                chw.broadcast_sub(&mean)
                    .and_then(|t| t.broadcast_div(&std))
                    .map_err(inference_error)?
            }
        };

        normalized.unsqueeze(0).map_err(inference_error)
    }
}
