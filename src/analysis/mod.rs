//! Two-stage analysis pipeline over the request gateway.
//!
//! Each operation is exactly one gateway call with a fixed
//! structured-output prompt; images are embedded as base64 inline parts
//! with the MIME type read from their data-URL header.

pub mod extract;
pub mod prompts;
pub mod types;

use std::sync::Arc;

use tracing::info;

use crate::capture;
use crate::config;
use crate::error::AiError;
use crate::gateway::{
    Content, GenerateContentRequest, GenerationConfig, Part, RequestGateway,
};
use crate::suggestion::{self, ParameterSuggestion};

pub use self::types::{
    AnalysisResult, ColorProfile, Complexity, Composition, DetailProfile, MapMode,
    PreviewAssessment, PreviewMetrics, SuggestionContext,
};

/// Sampling settings for the two assessment calls.
const ANALYSIS_GENERATION: GenerationConfig = GenerationConfig {
    temperature: 0.2,
    max_output_tokens: 512,
};

/// Sampling settings for the suggestion call, which emits a larger object.
const SUGGESTION_GENERATION: GenerationConfig = GenerationConfig {
    temperature: 0.3,
    max_output_tokens: 700,
};

/// Issues the structured-output analysis and suggestion calls.
pub struct AnalysisService {
    gateway: Arc<RequestGateway>,
    model: String,
}

impl AnalysisService {
    pub fn new(gateway: Arc<RequestGateway>) -> Self {
        Self {
            gateway,
            model: config::DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_model(gateway: Arc<RequestGateway>, model: impl Into<String>) -> Self {
        Self {
            gateway,
            model: model.into(),
        }
    }

    /// Analyze the uploaded original image.
    ///
    /// # Errors
    /// Service errors propagate from the gateway unchanged;
    /// [`AiError::Parse`] when the response lacks a decodable JSON object.
    pub async fn analyze_original_image(
        &self,
        image_data_url: &str,
    ) -> Result<AnalysisResult, AiError> {
        info!("Analyzing original image");
        let contents = vec![Content::user(vec![
            Part::text(prompts::original_analysis_prompt()),
            Part::inline(capture::data_url_to_inline(image_data_url)),
        ])];

        let reply = self.submit(contents, ANALYSIS_GENERATION).await?;
        let value = extract::extract_first_json(&reply.text)?;
        let result: AnalysisResult = serde_json::from_value(value)
            .map_err(|e| AiError::Parse(format!("Analysis payload had an unexpected shape: {}", e)))?;

        info!(
            "Original analysis complete: complexity {:?}, {} dominant colors",
            result.detail.complexity,
            result.colors.dominant_colors.len()
        );
        Ok(result)
    }

    /// Compare a rendered preview against the original image.
    pub async fn analyze_schematic_preview(
        &self,
        original_image_data_url: &str,
        preview_image_data_url: &str,
    ) -> Result<PreviewAssessment, AiError> {
        info!("Assessing preview against original");
        let contents = vec![Content::user(vec![
            Part::text(prompts::preview_assessment_prompt()),
            Part::inline(capture::data_url_to_inline(original_image_data_url)),
            Part::inline(capture::data_url_to_inline(preview_image_data_url)),
        ])];

        let reply = self.submit(contents, ANALYSIS_GENERATION).await?;
        let value = extract::extract_first_json(&reply.text)?;
        let assessment: PreviewAssessment = serde_json::from_value(value).map_err(|e| {
            AiError::Parse(format!("Assessment payload had an unexpected shape: {}", e))
        })?;

        info!(
            "Preview assessment complete: overall {:.2}, {} issues",
            assessment.metrics.overall,
            assessment.issues.len()
        );
        Ok(assessment)
    }

    /// Ask for parameter adjustments given the current context. The raw
    /// model output is normalized before it leaves this method, so the
    /// returned suggestion is always fully populated and in range.
    pub async fn suggest_parameters(
        &self,
        ctx: &SuggestionContext<'_>,
    ) -> Result<ParameterSuggestion, AiError> {
        info!("Requesting parameter suggestions (iteration {})", ctx.iteration);
        let contents = vec![Content::user(vec![Part::text(prompts::suggestion_prompt(
            ctx,
        ))])];

        let reply = self.submit(contents, SUGGESTION_GENERATION).await?;
        let raw = extract::extract_first_json(&reply.text)?;
        Ok(suggestion::normalize(&raw))
    }

    async fn submit(
        &self,
        contents: Vec<Content>,
        generation_config: GenerationConfig,
    ) -> Result<crate::gateway::GatewayReply, AiError> {
        let mut request = GenerateContentRequest::new(contents, generation_config);
        request.model = self.model.clone();
        self.gateway.submit(request).await
    }
}
