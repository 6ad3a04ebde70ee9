//! Normalization of untrusted suggestion JSON into the canonical shape.
//!
//! The model's output is never trusted: every field goes through the same
//! clamp-or-default table, so downstream code sees exactly one shape with
//! every value in range.

use serde_json::Value;

use super::types::{
    DitherMethod, DitheringSuggestion, ParameterSuggestion, PreprocessingSuggestion,
    ScaleFactorSuggestion, SupportBlocksSuggestion, SupportPlacement, TransparencySuggestion,
};

/// Normalize arbitrary JSON into a fully populated, in-range
/// [`ParameterSuggestion`]. Total (never fails, `{}` and non-objects
/// included) and idempotent.
pub fn normalize(raw: &Value) -> ParameterSuggestion {
    let dithering = DitheringSuggestion {
        method: raw["dithering"]["method"]
            .as_str()
            .and_then(DitherMethod::parse)
            .unwrap_or(DitherMethod::FloydSteinberg),
        reason: reason_of(&raw["dithering"]),
    };

    let scale_factor = ScaleFactorSuggestion {
        value: clamp(number_or(&raw["scaleFactor"]["value"], 1.0), 0.5, 2.0),
        reason: reason_of(&raw["scaleFactor"]),
    };

    let preprocessing = PreprocessingSuggestion {
        enabled: raw["preprocessing"]["enabled"].as_bool().unwrap_or(false),
        blur_px: clamp(number_or(&raw["preprocessing"]["blurPx"], 0.0), 0.0, 6.0),
        sharpen: clamp(number_or(&raw["preprocessing"]["sharpen"], 0.0), 0.0, 100.0),
        brightness: clamp(
            number_or(&raw["preprocessing"]["brightness"], 100.0),
            0.0,
            200.0,
        ),
        contrast: clamp(
            number_or(&raw["preprocessing"]["contrast"], 100.0),
            0.0,
            200.0,
        ),
        saturation: clamp(
            number_or(&raw["preprocessing"]["saturation"], 100.0),
            0.0,
            200.0,
        ),
        reason: reason_of(&raw["preprocessing"]),
    };

    let transparency = TransparencySuggestion {
        enabled: raw["transparency"]["enabled"].as_bool().unwrap_or(false),
        tolerance: clamp(
            number_or(&raw["transparency"]["tolerance"], 128.0),
            0.0,
            256.0,
        ),
        reason: reason_of(&raw["transparency"]),
    };

    let support_blocks = SupportBlocksSuggestion {
        placement: raw["supportBlocks"]["where"]
            .as_str()
            .and_then(SupportPlacement::parse)
            .unwrap_or(SupportPlacement::AllOptimized),
        support_block: raw["supportBlocks"]["supportBlock"]
            .as_str()
            .filter(|s| !s.is_empty())
            .unwrap_or("cobblestone")
            .to_string(),
        reason: reason_of(&raw["supportBlocks"]),
    };

    ParameterSuggestion {
        dithering,
        scale_factor,
        preprocessing,
        transparency,
        support_blocks,
    }
}

fn clamp(n: f64, min: f64, max: f64) -> f64 {
    n.max(min).min(max)
}

fn number_or(value: &Value, default: f64) -> f64 {
    value.as_f64().unwrap_or(default)
}

fn reason_of(section: &Value) -> Option<String> {
    section["reason"]
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
