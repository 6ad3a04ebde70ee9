use serde::{Deserialize, Serialize};

/// Dithering algorithms the conversion engine supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DitherMethod {
    #[serde(rename = "none")]
    None,
    #[serde(rename = "ordered")]
    Ordered,
    #[serde(rename = "floyd-steinberg")]
    FloydSteinberg,
    #[serde(rename = "bayer")]
    Bayer,
}

impl DitherMethod {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "none" => Some(DitherMethod::None),
            "ordered" => Some(DitherMethod::Ordered),
            "floyd-steinberg" => Some(DitherMethod::FloydSteinberg),
            "bayer" => Some(DitherMethod::Bayer),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DitherMethod::None => "none",
            DitherMethod::Ordered => "ordered",
            DitherMethod::FloydSteinberg => "floyd-steinberg",
            DitherMethod::Bayer => "bayer",
        }
    }
}

/// Where the exporter places support blocks under the map surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupportPlacement {
    None,
    Important,
    AllOptimized,
    AllDoubleOptimized,
}

impl SupportPlacement {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "none" => Some(SupportPlacement::None),
            "important" => Some(SupportPlacement::Important),
            "all_optimized" => Some(SupportPlacement::AllOptimized),
            "all_double_optimized" => Some(SupportPlacement::AllDoubleOptimized),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SupportPlacement::None => "none",
            SupportPlacement::Important => "important",
            SupportPlacement::AllOptimized => "all_optimized",
            SupportPlacement::AllDoubleOptimized => "all_double_optimized",
        }
    }
}

/// Canonical parameter suggestion. After normalization every numeric and
/// enum field is present and in range; only the `reason` strings may be
/// absent. Never partially valid.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterSuggestion {
    pub dithering: DitheringSuggestion,
    pub scale_factor: ScaleFactorSuggestion,
    pub preprocessing: PreprocessingSuggestion,
    pub transparency: TransparencySuggestion,
    pub support_blocks: SupportBlocksSuggestion,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DitheringSuggestion {
    pub method: DitherMethod,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScaleFactorSuggestion {
    pub value: f64,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreprocessingSuggestion {
    pub enabled: bool,
    pub blur_px: f64,
    pub sharpen: f64,
    pub brightness: f64,
    pub contrast: f64,
    pub saturation: f64,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransparencySuggestion {
    pub enabled: bool,
    pub tolerance: f64,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportBlocksSuggestion {
    #[serde(rename = "where")]
    pub placement: SupportPlacement,
    pub support_block: String,
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dither_method_round_trip() {
        for method in [
            DitherMethod::None,
            DitherMethod::Ordered,
            DitherMethod::FloydSteinberg,
            DitherMethod::Bayer,
        ] {
            assert_eq!(DitherMethod::parse(method.as_str()), Some(method));
        }
        assert_eq!(DitherMethod::parse("atkinson"), None);
    }

    #[test]
    fn test_support_placement_round_trip() {
        for placement in [
            SupportPlacement::None,
            SupportPlacement::Important,
            SupportPlacement::AllOptimized,
            SupportPlacement::AllDoubleOptimized,
        ] {
            assert_eq!(SupportPlacement::parse(placement.as_str()), Some(placement));
        }
        assert_eq!(SupportPlacement::parse("everywhere"), None);
    }

    #[test]
    fn test_suggestion_serializes_with_wire_keys() {
        let suggestion = ParameterSuggestion {
            dithering: DitheringSuggestion {
                method: DitherMethod::FloydSteinberg,
                reason: None,
            },
            scale_factor: ScaleFactorSuggestion {
                value: 1.5,
                reason: Some("keep detail".to_string()),
            },
            preprocessing: PreprocessingSuggestion {
                enabled: true,
                blur_px: 1.0,
                sharpen: 20.0,
                brightness: 105.0,
                contrast: 110.0,
                saturation: 95.0,
                reason: None,
            },
            transparency: TransparencySuggestion {
                enabled: false,
                tolerance: 128.0,
                reason: None,
            },
            support_blocks: SupportBlocksSuggestion {
                placement: SupportPlacement::AllOptimized,
                support_block: "cobblestone".to_string(),
                reason: None,
            },
        };

        let value = serde_json::to_value(&suggestion).unwrap();
        assert_eq!(value["dithering"]["method"], "floyd-steinberg");
        assert_eq!(value["scaleFactor"]["value"], 1.5);
        assert_eq!(value["preprocessing"]["blurPx"], 1.0);
        assert_eq!(value["supportBlocks"]["where"], "all_optimized");
        assert_eq!(value["supportBlocks"]["supportBlock"], "cobblestone");
    }
}
