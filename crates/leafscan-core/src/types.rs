//! Core types for LeafScan

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between crop and condition in a class identifier
pub const CLASS_SEPARATOR: &str = "___";

/// Disease label shown when the gate rejects an image
pub const NOT_A_PLANT: &str = "Not a Plant";

/// Confidence (percent) above which a prediction is reported as high confidence
pub const HIGH_CONFIDENCE_ABOVE: f64 = 85.0;

/// Confidence (percent) above which a prediction is reported as moderate confidence
pub const MODERATE_CONFIDENCE_ABOVE: f64 = 70.0;

/// Identifier of a crop/condition pair the disease model can output,
/// e.g. `Apple___Apple_scab`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DiseaseClass(String);

impl DiseaseClass {
    /// Create a class identifier, checking that it has a crop and a condition
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        match id.split_once(CLASS_SEPARATOR) {
            Some((crop, condition)) if !crop.is_empty() && !condition.is_empty() => Ok(Self(id)),
            _ => Err(Error::config(format!(
                "disease class '{id}' must have the form <Crop>{CLASS_SEPARATOR}<Condition>"
            ))),
        }
    }

    /// The raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Crop part of the identifier (`Cherry_(including_sour)`)
    pub fn crop(&self) -> &str {
        self.0
            .split_once(CLASS_SEPARATOR)
            .map_or(self.0.as_str(), |(crop, _)| crop)
    }

    /// Condition part of the identifier (`Powdery_mildew`, `healthy`)
    pub fn condition(&self) -> &str {
        self.0
            .split_once(CLASS_SEPARATOR)
            .map_or("", |(_, condition)| condition)
    }

    /// Whether the model considers the leaf free of disease
    pub fn is_healthy(&self) -> bool {
        self.condition().eq_ignore_ascii_case("healthy")
    }

    /// Human-readable name: `Tomato___Late_blight` becomes `Tomato - Late blight`
    pub fn display_name(&self) -> String {
        self.0.replace(CLASS_SEPARATOR, " - ").replace('_', " ")
    }
}

impl fmt::Display for DiseaseClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DiseaseClass {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<DiseaseClass> for String {
    fn from(class: DiseaseClass) -> Self {
        class.0
    }
}

/// Display bucket derived from prediction confidence.
///
/// This describes how sure the model is, not how severe the disease is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeverityTier {
    #[serde(rename = "High Confidence")]
    High,
    #[serde(rename = "Moderate Confidence")]
    Moderate,
    #[serde(rename = "Low Confidence")]
    Low,
    #[serde(rename = "N/A")]
    NotApplicable,
}

impl SeverityTier {
    /// Bucket a confidence percentage. Both boundaries are exclusive:
    /// 85.0 is moderate and 70.0 is low.
    pub fn from_confidence(confidence_percent: f64) -> Self {
        if confidence_percent > HIGH_CONFIDENCE_ABOVE {
            Self::High
        } else if confidence_percent > MODERATE_CONFIDENCE_ABOVE {
            Self::Moderate
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "High Confidence",
            Self::Moderate => "Moderate Confidence",
            Self::Low => "Low Confidence",
            Self::NotApplicable => "N/A",
        }
    }
}

impl fmt::Display for SeverityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of running an image through the decision pipeline.
///
/// Serializes to the `/predict` response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    /// Display name of the detected class, or "Not a Plant"
    pub disease: String,

    /// Confidence bucket
    pub severity: SeverityTier,

    /// Advisory text
    pub treatment: String,

    /// Confidence in percent, rounded to two decimals
    pub confidence: f64,

    /// Whether the plant-presence gate accepted the image
    #[serde(rename = "isPlant")]
    pub is_plant: bool,
}

impl Diagnosis {
    /// Diagnosis for an image the gate rejected. `probability` is the gate's
    /// top-1 probability in `[0, 1]`.
    pub fn not_a_plant(top_label: &str, probability: f32) -> Self {
        Self {
            disease: NOT_A_PLANT.to_string(),
            severity: SeverityTier::NotApplicable,
            treatment: format!(
                "This image appears to be \"{}\" with {:.1}% confidence. \
                 Please upload an image of a plant leaf showing any disease symptoms.",
                top_label,
                f64::from(probability) * 100.0
            ),
            confidence: 0.0,
            is_plant: false,
        }
    }

    /// Diagnosis for a classified leaf
    pub fn detected(class: &DiseaseClass, confidence_percent: f64, treatment: impl Into<String>) -> Self {
        Self {
            disease: class.display_name(),
            severity: SeverityTier::from_confidence(confidence_percent),
            treatment: treatment.into(),
            confidence: round_to_hundredths(confidence_percent),
            is_plant: true,
        }
    }
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
