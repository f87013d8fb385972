//! Sequential CNN used by the disease classifier
//!
//! Mirrors a Keras `Sequential` model of `Conv2D(relu) -> MaxPooling2D`
//! blocks, `Flatten`, `Dense(relu)` layers and a final `Dense` head.
//! Weights are expected in SafeTensors with these names:
//!
//! - `conv{i}.weight` `(out, in, k, k)` and `conv{i}.bias`
//! - `dense{i}.weight` `(out, in)` and `dense{i}.bias`
//! - `output.weight` `(classes, in)` and `output.bias`
//!
//! Keras stores kernels as `(k, k, in, out)` and dense weights as
//! `(in, out)`; the export transposes them but leaves row order alone,
//! which is why the forward pass flattens in NHWC order.

use crate::classifier::{inference_error, validate_scores, ImageClassifier};
use crate::config::DiseaseModelConfig;
use crate::model_loader::{load_safetensors, ModelSource};
use candle_core::{Device, Module, Tensor, D};
use candle_nn::{Conv2d, Conv2dConfig, Linear, VarBuilder};
use leafscan_core::{Error, Result};
use tracing::info;

pub struct LeafCnn {
    convs: Vec<Conv2d>,
    hidden: Vec<Linear>,
    output: Linear,
}

impl LeafCnn {
    pub fn new(config: &DiseaseModelConfig, num_classes: usize, vb: VarBuilder) -> Result<Self> {
        config.validate()?;
        let build_err = |e: candle_core::Error| Error::model(format!("failed to build disease CNN: {e}"));

        let mut convs = Vec::with_capacity(config.conv_filters.len());
        let mut in_channels = 3;
        for (i, &filters) in config.conv_filters.iter().enumerate() {
            let conv = candle_nn::conv2d(
                in_channels,
                filters,
                config.kernel_size,
                Conv2dConfig::default(),
                vb.pp(format!("conv{i}")),
            )
            .map_err(build_err)?;
            convs.push(conv);
            in_channels = filters;
        }

        let mut in_features = config
            .flattened_features()
            .ok_or_else(|| Error::config("disease CNN input is too small for its conv blocks"))?;

        let mut hidden = Vec::with_capacity(config.dense_units.len());
        for (i, &units) in config.dense_units.iter().enumerate() {
            hidden.push(candle_nn::linear(in_features, units, vb.pp(format!("dense{i}"))).map_err(build_err)?);
            in_features = units;
        }

        let output = candle_nn::linear(in_features, num_classes, vb.pp("output")).map_err(build_err)?;

        Ok(Self {
            convs,
            hidden,
            output,
        })
    }
}

impl Module for LeafCnn {
    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        let mut xs = xs.clone();
        for conv in &self.convs {
            xs = conv.forward(&xs)?.relu()?.max_pool2d(2)?;
        }

        // NCHW -> NHWC so flattened features line up with the Keras dense weights
        let mut xs = xs.permute((0, 2, 3, 1))?.contiguous()?.flatten_from(1)?;
        for layer in &self.hidden {
            xs = layer.forward(&xs)?.relu()?;
        }
        self.output.forward(&xs)
    }
}

/// Disease classifier backed by [`LeafCnn`]
pub struct LeafCnnClassifier {
    name: String,
    model: LeafCnn,
}

impl LeafCnnClassifier {
    /// Load converted weights for a catalog of `num_classes` classes
    pub fn load(config: &DiseaseModelConfig, num_classes: usize, device: &Device) -> Result<Self> {
        let weights_path = config.weights.resolve()?;
        let vb = load_safetensors(&weights_path, device)?;
        let model = LeafCnn::new(config, num_classes, vb)?;

        info!(
            "Loaded disease CNN ({} conv blocks, {} classes) from {}",
            config.conv_filters.len(),
            num_classes,
            weights_path.display()
        );

        Ok(Self::from_model(weights_name(&config.weights), model))
    }

    pub fn from_model(name: impl Into<String>, model: LeafCnn) -> Self {
        Self {
            name: name.into(),
            model,
        }
    }
}

impl ImageClassifier for LeafCnnClassifier {
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

fn weights_name(source: &ModelSource) -> String {
    match source {
        ModelSource::Local { path } => path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("leaf-cnn")
            .to_string(),
        ModelSource::HuggingFace { repo_id, .. } => repo_id.clone(),
    }
}
