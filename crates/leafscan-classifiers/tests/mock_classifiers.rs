//! Mock classifiers for testing
//!
//! Provides configurable mock implementations of the ImageClassifier trait
//! and helpers that wire them into gates, disease classifiers and pipelines
//! without loading any weights.

#![allow(dead_code)]

use candle_core::{Device, Tensor};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use leafscan_classifiers::{
    DiagnosisPipeline, DiseaseClassifier, GateConfig, ImageClassifier, LabelSet, PlantGate,
};
use leafscan_core::{Catalog, Error, Result};
use std::io::Cursor;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// Gate labels used by the mock gate, in model output order
pub const GATE_LABELS: &[&str] = &[
    "tabby, tabby cat",
    "golden retriever",
    "head cabbage",
    "Granny Smith",
    "daisy",
    "lemon",
];

pub const TABBY: usize = 0;
pub const RETRIEVER: usize = 1;
pub const CABBAGE: usize = 2;
pub const LEMON: usize = 5;

/// A mock classifier returning a fixed probability vector
pub struct MockImageClassifier {
    name: String,
    scores: Vec<f32>,
    call_count: AtomicU32,
    last_shape: Mutex<Option<Vec<usize>>>,
}

impl MockImageClassifier {
    /// Create a new mock classifier with the given name and scores
    pub fn new(name: &str, scores: Vec<f32>) -> Self {
        Self {
            name: name.to_string(),
            scores,
            call_count: AtomicU32::new(0),
            last_shape: Mutex::new(None),
        }
    }

    /// Mock whose output puts `peak` on `index` and spreads the rest evenly
    pub fn peaked(name: &str, len: usize, index: usize, peak: f32) -> Self {
        Self::new(name, peaked_scores(len, &[(index, peak)]))
    }

    /// Number of times predict was called
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Shape of the last input tensor
    pub fn last_shape(&self) -> Option<Vec<usize>> {
        self.last_shape.lock().ok().and_then(|shape| shape.clone())
    }
}

impl ImageClassifier for MockImageClassifier {
    fn predict(&self, input: &Tensor) -> Result<Vec<f32>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut shape) = self.last_shape.lock() {
            *shape = Some(input.dims().to_vec());
        }
        Ok(self.scores.clone())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A classifier that always fails
pub struct FailingClassifier {
    name: String,
    error_message: String,
}

impl FailingClassifier {
    /// Create a new failing classifier
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            error_message: "Simulated classifier failure".to_string(),
        }
    }

    /// Set a custom error message
    pub fn with_error(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }
}

impl ImageClassifier for FailingClassifier {
    fn predict(&self, _input: &Tensor) -> Result<Vec<f32>> {
        Err(Error::inference(&self.error_message))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Probability vector with the given peaks and the remainder spread evenly
pub fn peaked_scores(len: usize, peaks: &[(usize, f32)]) -> Vec<f32> {
    let peak_total: f32 = peaks.iter().map(|(_, p)| p).sum();
    let rest = len.saturating_sub(peaks.len()).max(1) as f32;
    let filler = ((1.0 - peak_total) / rest).max(0.0);

    let mut scores = vec![filler; len];
    for &(index, probability) in peaks {
        scores[index] = probability;
    }
    scores
}

/// Gate over [`GATE_LABELS`] with the default keyword policy
pub fn mock_gate(model: Arc<dyn ImageClassifier>) -> PlantGate {
    let labels = LabelSet::new(GATE_LABELS.iter().map(|l| l.to_string()).collect()).unwrap();
    PlantGate::new(model, labels, &GateConfig::default(), Device::Cpu).unwrap()
}

/// Disease classifier over the given catalog with a small input size
pub fn mock_disease(model: Arc<dyn ImageClassifier>, catalog: Catalog) -> DiseaseClassifier {
    DiseaseClassifier::new(model, Arc::new(catalog), 32, Device::Cpu)
}

/// Pipeline over the builtin catalog
pub fn mock_pipeline(gate_model: Arc<dyn ImageClassifier>, disease_model: Arc<dyn ImageClassifier>) -> DiagnosisPipeline {
    mock_pipeline_with_catalog(gate_model, disease_model, Catalog::builtin().unwrap())
}

/// Pipeline over a custom catalog
pub fn mock_pipeline_with_catalog(
    gate_model: Arc<dyn ImageClassifier>,
    disease_model: Arc<dyn ImageClassifier>,
    catalog: Catalog,
) -> DiagnosisPipeline {
    DiagnosisPipeline::new(mock_gate(gate_model), mock_disease(disease_model, catalog))
}

/// A solid green square encoded in the given format
pub fn leaf_image_bytes(format: ImageFormat) -> Vec<u8> {
    let image = RgbImage::from_pixel(48, 32, Rgb([40, 140, 60]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut bytes), format)
        .unwrap();
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_classifier_basic() {
        let classifier = MockImageClassifier::new("test", vec![0.25, 0.75]);
        let input = Tensor::zeros((1, 3, 4, 4), candle_core::DType::F32, &Device::Cpu).unwrap();

        let scores = classifier.predict(&input).unwrap();
        assert_eq!(scores, vec![0.25, 0.75]);
        assert_eq!(classifier.call_count(), 1);
        assert_eq!(classifier.last_shape(), Some(vec![1, 3, 4, 4]));
    }

    #[test]
    fn test_peaked_scores_sum_to_one() {
        let scores = peaked_scores(6, &[(2, 0.5), (5, 0.2)]);
        let total: f32 = scores.iter().sum();
        assert!((total - 1.0).abs() < 1e-5);
        assert_eq!(scores[2], 0.5);
        assert_eq!(scores[5], 0.2);
    }

    #[test]
    fn test_failing_classifier() {
        let classifier = FailingClassifier::new("fail-test").with_error("Custom error");
        let input = Tensor::zeros((1, 3, 4, 4), candle_core::DType::F32, &Device::Cpu).unwrap();

        let err = classifier.predict(&input).unwrap_err();
        assert!(matches!(err, Error::Inference(_)));
        assert!(err.to_string().contains("Custom error"));
    }
}
