use serde::Serialize;

use crate::analysis::{AnalysisResult, PreviewAssessment};
use crate::suggestion::ParameterSuggestion;

/// Lifecycle status of the current analysis run. `Disabled` is entered
/// and left only through explicit enable/disable and is orthogonal to the
/// analysis flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisStatus {
    Idle,
    WaitingPreview,
    Analyzing,
    Ready,
    Error,
    Disabled,
}

/// The current run: a monotonically increasing id plus its status.
/// Allocating a new run invalidates every continuation issued for older
/// ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnalysisRun {
    pub id: u64,
    pub status: AnalysisStatus,
}

/// Cancellation token for one logical run. Continuations capture it at
/// start and must re-check it after every suspension point before any
/// state mutation. Cooperative only: a stale token stops the continuation
/// but does not abort the underlying network call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunToken(pub(crate) u64);

/// State of the post-generation refinement loop.
#[derive(Debug, Clone, Serialize)]
pub struct RefinementSession {
    pub open: bool,
    pub loading: bool,
    pub error: Option<String>,
    pub feedback: Option<PreviewAssessment>,
    pub suggestion: Option<ParameterSuggestion>,
    pub round: u32,
    pub max_rounds: u32,
}

impl RefinementSession {
    pub fn new(max_rounds: u32) -> Self {
        Self {
            open: false,
            loading: false,
            error: None,
            feedback: None,
            suggestion: None,
            round: 0,
            max_rounds,
        }
    }
}

/// Read-only projection of orchestrator state for the UI. All fields are
/// copies; mutating them has no effect on the orchestrator.
#[derive(Debug, Clone, Serialize)]
pub struct AiOverview {
    pub enabled: bool,
    pub run: AnalysisRun,
    pub error: Option<String>,
    pub pre_edit_active: bool,
    pub original_analysis: Option<AnalysisResult>,
    pub preview_assessment: Option<PreviewAssessment>,
    pub suggestion: Option<ParameterSuggestion>,
    pub preview_before: Option<String>,
    pub preview_after: Option<String>,
    pub refinement: RefinementSession,
}
