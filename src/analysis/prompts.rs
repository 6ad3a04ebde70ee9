//! Structured-output prompts for the analysis and suggestion calls.

use super::types::SuggestionContext;

/// Prompt for analyzing the uploaded original image.
pub fn original_analysis_prompt() -> String {
    "You are analyzing an image for conversion into Minecraft map art. \
     Return ONLY valid JSON (no markdown, no explanations outside JSON).\n\
     Schema:\n\
     {\n\
       composition: { subject: string|null, hasText: boolean, notes: string|null },\n\
       colors: { dominantColors: string[], vibrancy: number, contrast: number },\n\
       detail: { complexity: 'low'|'medium'|'high', fineDetails: boolean, notes: string|null }\n\
     }\n\
     Use 0..1 for vibrancy/contrast."
        .to_string()
}

/// Prompt for comparing a rendered preview against the original. The two
/// images ride along in the order announced here.
pub fn preview_assessment_prompt() -> String {
    "You are evaluating a Minecraft map art preview against the original image. \
     Return ONLY valid JSON (no markdown).\n\
     Schema:\n\
     {\n\
       metrics: { fidelity: number, colorAccuracy: number, detailPreservation: number, overall: number },\n\
       issues: string[],\n\
       positives: string[]\n\
     }\n\
     All metrics must be 0..1.\n\
     First image: ORIGINAL. Second image: PREVIEW."
        .to_string()
}

/// Prompt for the parameter suggestion call, with the analysis context
/// serialized inline.
pub fn suggestion_prompt(ctx: &SuggestionContext<'_>) -> String {
    let current_params =
        serde_json::to_string(ctx.current_params).unwrap_or_else(|_| "{}".to_string());
    let original_analysis =
        serde_json::to_string(ctx.original_analysis).unwrap_or_else(|_| "{}".to_string());
    let preview_analysis =
        serde_json::to_string(ctx.preview_assessment).unwrap_or_else(|_| "{}".to_string());

    format!(
        "You suggest parameter adjustments for generating Minecraft map art. \
         You MUST NOT change map size or block palette selection. \
         Return ONLY valid JSON.\n\n\
         Allowed dithering methods: none | ordered | floyd-steinberg | bayer\n\
         Scale factor range: 0.5..2 (float)\n\
         Preprocessing: enabled(boolean), blurPx(0..6), sharpen(0..100), brightness(0..200), contrast(0..200), saturation(0..200)\n\
         Transparency: enabled(boolean), tolerance(0..256) (only meaningful for mapdat; still output)\n\
         Support blocks where: none | important | all_optimized | all_double_optimized\n\n\
         Schema:\n\
         {{\n\
           dithering: {{ method: string, reason: string|null }},\n\
           scaleFactor: {{ value: number, reason: string|null }},\n\
           preprocessing: {{ enabled: boolean, blurPx: number, sharpen: number, brightness: number, contrast: number, saturation: number, reason: string|null }},\n\
           transparency: {{ enabled: boolean, tolerance: number, reason: string|null }},\n\
           supportBlocks: {{ where: string, supportBlock: string, reason: string|null }}\n\
         }}\n\n\
         Context:\n\
         mode: {mode}\n\
         iteration: {iteration}\n\
         currentParams: {current_params}\n\
         originalAnalysis: {original_analysis}\n\
         previewAnalysis: {preview_analysis}\n",
        mode = ctx.mode.as_str(),
        iteration = ctx.iteration,
    )
}
