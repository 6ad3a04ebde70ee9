//! Structured assessments produced by the analysis calls.
//!
//! These decode model output, so every field is lenient: missing pieces
//! fall back to defaults instead of failing an otherwise-usable analysis.
//! Only parameter suggestions get strict normalization (see the
//! suggestion module); assessments are informational.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::settings::ParameterSnapshot;

/// Analysis of the uploaded original image. Produced once per run and
/// immutable afterwards; owned by the orchestrator for the run lifetime.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisResult {
    pub composition: Composition,
    pub colors: ColorProfile,
    pub detail: DetailProfile,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Composition {
    pub subject: Option<String>,
    pub has_text: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ColorProfile {
    pub dominant_colors: Vec<String>,
    pub vibrancy: f64,
    pub contrast: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DetailProfile {
    pub complexity: Complexity,
    pub fine_details: bool,
    pub notes: Option<String>,
}

/// Coarse detail complexity rating. Anything the model emits outside the
/// three known levels reads as `Medium`.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    #[default]
    Medium,
    High,
}

impl<'de> Deserialize<'de> for Complexity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(
            match value.as_str().map(|s| s.to_ascii_lowercase()).as_deref() {
                Some("low") => Complexity::Low,
                Some("high") => Complexity::High,
                _ => Complexity::Medium,
            },
        )
    }
}

/// Assessment of a rendered preview against the original. Superseded by
/// the next assessment of the same kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PreviewAssessment {
    pub metrics: PreviewMetrics,
    pub issues: Vec<String>,
    pub positives: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PreviewMetrics {
    pub fidelity: f64,
    pub color_accuracy: f64,
    pub detail_preservation: f64,
    pub overall: f64,
}

/// Output format the conversion pipeline is targeting. Transparency only
/// matters for mapdat output but is always suggested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapMode {
    Nbt,
    Mapdat,
}

impl MapMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MapMode::Nbt => "nbt",
            MapMode::Mapdat => "mapdat",
        }
    }
}

/// Everything the suggestion prompt needs: the two assessments, the live
/// parameters, the output mode, and which refinement iteration this is
/// (0 for the initial run).
pub struct SuggestionContext<'a> {
    pub original_analysis: &'a AnalysisResult,
    pub preview_assessment: &'a PreviewAssessment,
    pub current_params: &'a ParameterSnapshot,
    pub mode: MapMode,
    pub iteration: u32,
}
