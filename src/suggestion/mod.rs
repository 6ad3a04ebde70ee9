pub mod types;
pub mod validation;

pub use self::types::{
    DitherMethod, DitheringSuggestion, ParameterSuggestion, PreprocessingSuggestion,
    ScaleFactorSuggestion, SupportBlocksSuggestion, SupportPlacement, TransparencySuggestion,
};
pub use self::validation::normalize;
