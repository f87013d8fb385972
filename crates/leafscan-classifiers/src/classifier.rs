//! Classifier trait and common types

use candle_core::Tensor;
use leafscan_core::{Error, Result};

/// A pretrained image model used as a black box.
///
/// Implementations receive a single preprocessed image of shape
/// `(1, 3, height, width)` and return one probability per output class.
pub trait ImageClassifier: Send + Sync {
    /// Run the model and return class probabilities
    fn predict(&self, input: &Tensor) -> Result<Vec<f32>>;

    /// Get the classifier name
    fn name(&self) -> &str;
}

/// A decoded prediction: class position, its label and probability
#[derive(Debug, Clone, PartialEq)]
pub struct LabelScore {
    /// Position in the model output
    pub index: usize,

    /// Human-readable label
    pub label: String,

    /// Probability (0.0-1.0)
    pub score: f32,
}

impl LabelScore {
    pub fn new(index: usize, label: impl Into<String>, score: f32) -> Self {
        Self {
            index,
            label: label.into(),
            score,
        }
    }
}

/// Reject probability vectors a broken model or weight file would produce
pub fn validate_scores(model: &str, scores: &[f32]) -> Result<()> {
    if scores.is_empty() {
        return Err(Error::inference(format!("{model} produced no scores")));
    }
    if let Some(position) = scores.iter().position(|s| !s.is_finite()) {
        return Err(Error::inference(format!(
            "{model} produced a non-finite score at index {position}"
        )));
    }
    Ok(())
}

/// Indices of the `k` highest scores, best first. Equal scores keep
/// ascending index order.
pub fn top_k(scores: &[f32], k: usize) -> Vec<(usize, f32)> {
    let mut ranked: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(k);
    ranked
}

/// Index and value of the highest score; the first index wins on ties
pub fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (index, &score) in scores.iter().enumerate() {
        match best {
            Some((_, current)) if score <= current => {}
            _ => best = Some((index, score)),
        }
    }
    best
}

pub(crate) fn inference_error(err: candle_core::Error) -> Error {
    Error::inference(err.to_string())
}
