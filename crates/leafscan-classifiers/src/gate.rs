//! Plant-presence gate
//!
//! Runs a general-purpose ImageNet classifier and accepts the image when its
//! top predictions name something plant-like. The general model never saw
//! leaf close-ups during training, so it is often only weakly confident about
//! them; the gate therefore uses two thresholds. A keyword match above the
//! strong threshold is accepted at once (the first one in rank order, which
//! is also the most probable). Otherwise the best keyword match is accepted
//! if it clears the weak threshold. Everything else is rejected and the
//! top-1 prediction is reported back for display.

use crate::classifier::{top_k, validate_scores, ImageClassifier, LabelScore};
use crate::backbone::{MobileNetV4Classifier, IMAGENET_CLASSES};
use crate::config::GateConfig;
use crate::labels::LabelSet;
use crate::preprocess::{Normalization, Preprocessor};
use aho_corasick::AhoCorasick;
use candle_core::Device;
use image::RgbImage;
use leafscan_core::{Error, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Outcome of the plant-presence check
#[derive(Debug, Clone, PartialEq)]
pub struct GateVerdict {
    /// Whether the image looks like a plant
    pub accepted: bool,

    /// Matching label when accepted, top-1 label when rejected
    pub label: String,

    /// Probability of `label` (0.0-1.0)
    pub confidence: f32,
}

/// Case-insensitive substring matcher over plant keywords.
///
/// Labels and keywords both have underscores replaced by spaces before
/// matching, so `head_cabbage` matches the label `head cabbage`.
pub struct KeywordMatcher {
    matcher: AhoCorasick,
    count: usize,
}

impl KeywordMatcher {
    pub fn new<I, S>(keywords: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords: Vec<String> = keywords
            .into_iter()
            .map(|k| normalize(k.as_ref()).trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        if keywords.is_empty() {
            return Err(Error::config("keyword list must not be empty"));
        }

        let matcher = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(&keywords)
            .map_err(|e| Error::config(format!("failed to build keyword matcher: {e}")))?;

        Ok(Self {
            matcher,
            count: keywords.len(),
        })
    }

    pub fn matches(&self, label: &str) -> bool {
        self.matcher.is_match(&normalize(label))
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

fn normalize(text: &str) -> String {
    text.replace('_', " ")
}

/// Plant-presence gate over a general-purpose classifier
pub struct PlantGate {
    model: Arc<dyn ImageClassifier>,
    labels: LabelSet,
    preprocessor: Preprocessor,
    keywords: KeywordMatcher,
    top_k: usize,
    strong_threshold: f32,
    weak_threshold: f32,
    device: Device,
}

impl PlantGate {
    /// Build a gate around an already loaded model
    pub fn new(
        model: Arc<dyn ImageClassifier>,
        labels: LabelSet,
        config: &GateConfig,
        device: Device,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            model,
            labels,
            preprocessor: Preprocessor::new(config.input_size, Normalization::imagenet()),
            keywords: KeywordMatcher::new(&config.keywords)?,
            top_k: config.top_k,
            strong_threshold: config.strong_threshold,
            weak_threshold: config.weak_threshold,
            device,
        })
    }

    /// Load the configured backbone and its labels
    pub fn load(config: &GateConfig, device: &Device) -> Result<Self> {
        config.validate()?;
        let labels = LabelSet::load(&config.labels)?;
        if labels.len() != IMAGENET_CLASSES {
            return Err(Error::config(format!(
                "gate label file has {} entries, expected {}",
                labels.len(),
                IMAGENET_CLASSES
            )));
        }
        let model = MobileNetV4Classifier::load(config.architecture, &config.weights, device)?;
        Self::new(Arc::new(model), labels, config, device.clone())
    }

    /// Decide whether the image shows a plant
    pub fn is_plant(&self, image: &RgbImage) -> Result<GateVerdict> {
        let start = Instant::now();
        let input = self.preprocessor.to_tensor(image, &self.device)?;
        let scores = self.model.predict(&input)?;
        let ranked = self.rank(&scores)?;
        let verdict = self.decide(&ranked);

        debug!(
            model = self.model.name(),
            accepted = verdict.accepted,
            label = %verdict.label,
            confidence = verdict.confidence,
            latency_us = start.elapsed().as_micros() as u64,
            "plant gate verdict"
        );
        Ok(verdict)
    }

    /// Decode the top-k predictions, best first
    pub fn rank(&self, scores: &[f32]) -> Result<Vec<LabelScore>> {
        validate_scores(self.model.name(), scores)?;
        if scores.len() != self.labels.len() {
            return Err(Error::inference(format!(
                "{} produced {} scores but {} labels are loaded",
                self.model.name(),
                scores.len(),
                self.labels.len()
            )));
        }

        Ok(top_k(scores, self.top_k)
            .into_iter()
            .map(|(index, score)| {
                let label = self.labels.primary_name(index).unwrap_or_default();
                LabelScore::new(index, label, score)
            })
            .collect())
    }

    /// Apply the two-threshold keyword policy to ranked predictions
    pub fn decide(&self, ranked: &[LabelScore]) -> GateVerdict {
        let mut best_match: Option<&LabelScore> = None;

        for candidate in ranked {
            if !self.keywords.matches(&candidate.label) {
                continue;
            }
            if best_match.map_or(true, |best| candidate.score > best.score) {
                best_match = Some(candidate);
            }
            if candidate.score > self.strong_threshold {
                return accept(candidate);
            }
        }

        match best_match {
            Some(best) if best.score > self.weak_threshold => accept(best),
            _ => match ranked.first() {
                Some(top) => GateVerdict {
                    accepted: false,
                    label: top.label.clone(),
                    confidence: top.score,
                },
                None => GateVerdict {
                    accepted: false,
                    label: String::new(),
                    confidence: 0.0,
                },
            },
        }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }
}

fn accept(candidate: &LabelScore) -> GateVerdict {
    GateVerdict {
        accepted: true,
        label: candidate.label.clone(),
        confidence: candidate.score,
    }
}
