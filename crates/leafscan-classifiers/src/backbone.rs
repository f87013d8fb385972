//! ImageNet backbone for the plant-presence gate

use crate::classifier::{inference_error, validate_scores, ImageClassifier};
use crate::config::GateArchitecture;
use crate::model_loader::{load_safetensors, ModelSource};
use candle_core::{Device, Module, Tensor, D};
use candle_nn::Func;
use candle_transformers::models::mobilenetv4;
use leafscan_core::{Error, Result};
use tracing::info;

/// Number of ImageNet-1k classes
pub const IMAGENET_CLASSES: usize = 1000;

/// MobileNetV4 with its 1000-way ImageNet head
pub struct MobileNetV4Classifier {
    name: String,
    model: Func<'static>,
}

impl MobileNetV4Classifier {
    /// Load timm MobileNetV4 weights
    pub fn load(architecture: GateArchitecture, weights: &ModelSource, device: &Device) -> Result<Self> {
        let weights_path = weights.resolve()?;
        let vb = load_safetensors(&weights_path, device)?;

        let (name, cfg) = match architecture {
            GateArchitecture::MobileNetV4Small => ("mobilenetv4-small", mobilenetv4::Config::small()),
            GateArchitecture::MobileNetV4Medium => ("mobilenetv4-medium", mobilenetv4::Config::medium()),
            GateArchitecture::MobileNetV4Large => ("mobilenetv4-large", mobilenetv4::Config::large()),
        };

        let model = mobilenetv4::mobilenetv4(&cfg, IMAGENET_CLASSES, vb)
            .map_err(|e| Error::model(format!("failed to build {name}: {e}")))?;

        info!("Loaded gate backbone {} from {}", name, weights_path.display());

        Ok(Self {
            name: name.to_string(),
            model,
        })
    }
}

impl ImageClassifier for MobileNetV4Classifier {
    fn predict(&self, input: &Tensor) -> Result<Vec<f32>> {
        let logits = self.model.forward(input).map_err(inference_error)?;
        let scores = candle_nn::ops::softmax(&logits, D::Minus1)
            .and_then(|p| p.squeeze(0))
            .and_then(|p| p.to_vec1::<f32>())
            .map_err(inference_error)?;
        validate_scores(&self.name, &scores)?;
        Ok(scores)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
