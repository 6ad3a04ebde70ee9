//! Run lifecycle state machine for AI-assisted parameter suggestions.
//!
//! The orchestrator owns the current run id, the settings snapshots, and
//! the refinement session. Every multi-step async sequence captures a run
//! token when it starts and re-checks it after each await; a mismatch
//! means the run was superseded and the continuation stops without
//! touching state. Cancellation is cooperative: the underlying network
//! call is not aborted, only its result is discarded.
//!
//! Live settings are mutated exclusively here, through the
//! [`SettingsStore`] interface, never by the analysis or gateway layers.

pub mod types;

use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use crate::analysis::{
    AnalysisResult, AnalysisService, MapMode, PreviewAssessment, SuggestionContext,
};
use crate::capture;
use crate::config;
use crate::error::AiError;
use crate::settings::{snapshot_from_suggestion, ParameterSnapshot, SettingsStore};
use crate::suggestion::ParameterSuggestion;

pub use self::types::{AiOverview, AnalysisRun, AnalysisStatus, RefinementSession, RunToken};

/// Refinement rounds allowed per image before the loop stops offering
/// further passes.
pub const MAX_REFINEMENT_ROUNDS: u32 = 5;

struct OrchestratorState {
    enabled: bool,
    status: AnalysisStatus,
    error: Option<String>,
    mode: MapMode,
    original_image: Option<String>,
    preview_current: Option<String>,
    preview_before: Option<String>,
    preview_after: Option<String>,
    original_analysis: Option<AnalysisResult>,
    preview_assessment: Option<PreviewAssessment>,
    suggestion: Option<ParameterSuggestion>,
    pre_edit_active: bool,
    baseline_settings: Option<ParameterSnapshot>,
    initial_settings: Option<ParameterSnapshot>,
    run_id: u64,
    refinement: RefinementSession,
}

impl OrchestratorState {
    /// Start a fresh run: bump the id (invalidating in-flight
    /// continuations), re-capture both snapshots, and clear every
    /// artifact of the previous run including the refinement session.
    fn begin_run(&mut self, initial: ParameterSnapshot) {
        self.run_id += 1;
        self.baseline_settings = Some(initial.clone());
        self.initial_settings = Some(initial);
        self.original_analysis = None;
        self.preview_assessment = None;
        self.suggestion = None;
        self.preview_current = None;
        self.preview_before = None;
        self.preview_after = None;
        self.refinement = RefinementSession::new(self.refinement.max_rounds);
    }

    fn token(&self) -> RunToken {
        RunToken(self.run_id)
    }
}

/// Drives the analysis run lifecycle against the live settings store.
/// Shared behind an `Arc`; all methods take `&self`.
pub struct AnalysisOrchestrator {
    service: AnalysisService,
    settings: Arc<dyn SettingsStore>,
    /// Whether an API key was present when the orchestrator was built.
    /// A missing key disables the subsystem for the whole session.
    config_ok: bool,
    state: Mutex<OrchestratorState>,
}

impl AnalysisOrchestrator {
    pub fn new(service: AnalysisService, settings: Arc<dyn SettingsStore>, mode: MapMode) -> Self {
        let config_ok = config::has_api_key();
        if !config_ok {
            warn!("No Gemini API key found; AI suggestions disabled for this session");
        }

        let state = OrchestratorState {
            enabled: config_ok,
            status: if config_ok {
                AnalysisStatus::Idle
            } else {
                AnalysisStatus::Disabled
            },
            error: (!config_ok).then(|| AiError::MissingApiKey.to_string()),
            mode,
            original_image: None,
            preview_current: None,
            preview_before: None,
            preview_after: None,
            original_analysis: None,
            preview_assessment: None,
            suggestion: None,
            pre_edit_active: config_ok,
            baseline_settings: None,
            initial_settings: None,
            run_id: 0,
            refinement: RefinementSession::new(MAX_REFINEMENT_ROUNDS),
        };

        Self {
            service,
            settings,
            config_ok,
            state: Mutex::new(state),
        }
    }

    /// Current run status.
    pub fn status(&self) -> AnalysisStatus {
        self.state.lock().unwrap().status
    }

    /// Read-only projection of the current state for the UI.
    pub fn overview(&self) -> AiOverview {
        let st = self.state.lock().unwrap();
        AiOverview {
            enabled: st.enabled,
            run: AnalysisRun {
                id: st.run_id,
                status: st.status,
            },
            error: st.error.clone(),
            pre_edit_active: st.pre_edit_active,
            original_analysis: st.original_analysis.clone(),
            preview_assessment: st.preview_assessment.clone(),
            suggestion: st.suggestion.clone(),
            preview_before: st.preview_before.clone(),
            preview_after: st.preview_after.clone(),
            refinement: st.refinement.clone(),
        }
    }

    /// Switch the output mode used as context for subsequent suggestions.
    pub fn set_map_mode(&self, mode: MapMode) {
        self.state.lock().unwrap().mode = mode;
    }

    /// Transition 1: a new image was loaded. Captures the baseline and
    /// initial snapshots, allocates a new run, and waits for the first
    /// rendered preview. A conversion failure lands the run in `Error`
    /// with a descriptive message; the previous settings stay live.
    pub fn load_image(&self, image_bytes: &[u8]) {
        let initial = self.settings.get();
        let converted = capture::image_to_data_url(image_bytes, capture::MAX_CAPTURE_DIMENSION);

        let mut st = self.state.lock().unwrap();
        st.begin_run(initial);
        info!("New image loaded, starting run {}", st.run_id);

        match converted {
            Ok(data_url) => {
                st.original_image = Some(data_url);
                if st.enabled {
                    st.status = AnalysisStatus::WaitingPreview;
                    st.error = None;
                } else {
                    st.status = AnalysisStatus::Disabled;
                }
                st.pre_edit_active = st.enabled;
            }
            Err(e) if st.enabled => {
                warn!("Image capture failed: {}", e);
                st.original_image = None;
                st.status = AnalysisStatus::Error;
                st.error = Some(e.to_string());
                st.pre_edit_active = true;
            }
            Err(e) => {
                debug!("Image capture failed while disabled: {}", e);
                st.original_image = None;
                st.status = AnalysisStatus::Disabled;
            }
        }
    }

    /// Transition 2: the conversion pipeline rendered a preview. The first
    /// preview of a waiting run becomes the "before" image and starts the
    /// initial analysis; while the pre-edit panel is showing an applied
    /// suggestion, later previews become the "after" image.
    pub async fn preview_rendered(&self, preview_data_url: String) {
        let should_run = {
            let mut st = self.state.lock().unwrap();
            st.preview_current = Some(preview_data_url.clone());

            if st.enabled
                && st.status == AnalysisStatus::WaitingPreview
                && st.preview_before.is_none()
            {
                st.preview_before = Some(preview_data_url.clone());
            }
            if st.enabled && st.pre_edit_active && st.suggestion.is_some() {
                st.preview_after = Some(preview_data_url);
            }

            st.enabled
                && st.status == AnalysisStatus::WaitingPreview
                && st.original_image.is_some()
                && st.preview_before.is_some()
        };

        if should_run {
            self.run_initial_analysis().await;
        }
    }

    /// Transition 3: the initial analysis chain. Original analysis, then
    /// preview assessment, then suggestion; the run token is re-checked
    /// after every await. On success the suggestion is applied to the live
    /// settings; on failure the settings that were live at failure time
    /// are preserved.
    async fn run_initial_analysis(&self) {
        let (token, original, before, mode) = {
            let mut st = self.state.lock().unwrap();
            if !st.enabled || st.status != AnalysisStatus::WaitingPreview {
                return;
            }
            let (Some(original), Some(before)) =
                (st.original_image.clone(), st.preview_before.clone())
            else {
                return;
            };
            st.status = AnalysisStatus::Analyzing;
            st.error = None;
            st.pre_edit_active = true;
            (st.token(), original, before, st.mode)
        };
        info!("Starting initial analysis for run {}", token.0);

        let original_analysis = match self.service.analyze_original_image(&original).await {
            Ok(result) => result,
            Err(e) => return self.fail_initial(token, e),
        };
        if !self.is_current(token) {
            debug!("Discarding stale original analysis for run {}", token.0);
            return;
        }

        let assessment = match self
            .service
            .analyze_schematic_preview(&original, &before)
            .await
        {
            Ok(result) => result,
            Err(e) => return self.fail_initial(token, e),
        };
        if !self.is_current(token) {
            debug!("Discarding stale preview assessment for run {}", token.0);
            return;
        }

        let current_params = self.settings.get();
        let ctx = SuggestionContext {
            original_analysis: &original_analysis,
            preview_assessment: &assessment,
            current_params: &current_params,
            mode,
            iteration: 0,
        };
        let suggestion = match self.service.suggest_parameters(&ctx).await {
            Ok(result) => result,
            Err(e) => return self.fail_initial(token, e),
        };
        if !self.is_current(token) {
            debug!("Discarding stale suggestion for run {}", token.0);
            return;
        }

        {
            let mut st = self.state.lock().unwrap();
            if st.token() != token {
                return;
            }
            st.status = AnalysisStatus::Ready;
            st.error = None;
            st.original_analysis = Some(original_analysis);
            st.preview_assessment = Some(assessment);
            st.suggestion = Some(suggestion.clone());
            st.preview_after = None;
        }
        info!("Initial analysis ready for run {}, applying suggestion", token.0);
        self.settings.apply(&snapshot_from_suggestion(&suggestion));
    }

    fn fail_initial(&self, token: RunToken, error: AiError) {
        let mut st = self.state.lock().unwrap();
        if st.token() != token {
            debug!("Dropping error from stale run {}: {}", token.0, error);
            return;
        }
        warn!("Initial analysis failed for run {}: {}", token.0, error);
        st.status = AnalysisStatus::Error;
        st.error = Some(error.to_string());
        st.pre_edit_active = true;
    }

    /// Transition 4: keep the AI-adjusted settings and leave pre-edit.
    pub fn accept_all(&self) {
        self.state.lock().unwrap().pre_edit_active = false;
    }

    /// Transition 5: restore the baseline snapshot captured when the
    /// displayed run started, then leave pre-edit.
    pub fn reject_all(&self) {
        let baseline = {
            let st = self.state.lock().unwrap();
            st.baseline_settings
                .clone()
                .or_else(|| st.initial_settings.clone())
        };
        if let Some(snapshot) = baseline {
            self.settings.apply(&snapshot);
        }
        self.state.lock().unwrap().pre_edit_active = false;
    }

    /// Transition 6: proceed manually, keeping whatever is live. Used to
    /// move past an analysis failure as well.
    pub fn continue_manually(&self) {
        self.state.lock().unwrap().pre_edit_active = false;
    }

    /// Transition 7: a schematic was generated from the current settings.
    /// Opens the refinement session and runs assessment + suggestion
    /// against the freshly rendered preview, bounded by the round cap.
    /// Reuses the stored original analysis when available.
    pub async fn generation_complete(&self) {
        let (token, original, current_preview, cached_analysis, mode, round) = {
            let mut st = self.state.lock().unwrap();
            if !st.enabled {
                return;
            }
            let (Some(original), Some(current)) =
                (st.original_image.clone(), st.preview_current.clone())
            else {
                return;
            };
            if st.refinement.round >= st.refinement.max_rounds {
                info!(
                    "Refinement round cap reached ({}), ignoring generation event",
                    st.refinement.max_rounds
                );
                return;
            }
            st.refinement.open = true;
            st.refinement.loading = true;
            st.refinement.error = None;
            st.refinement.feedback = None;
            st.refinement.suggestion = None;
            (
                st.token(),
                original,
                current,
                st.original_analysis.clone(),
                st.mode,
                st.refinement.round,
            )
        };
        info!("Generation complete, assessing for refinement round {}", round + 1);

        let original_analysis = match cached_analysis {
            Some(analysis) => analysis,
            None => match self.service.analyze_original_image(&original).await {
                Ok(result) => result,
                Err(e) => return self.fail_refinement(token, e),
            },
        };
        if !self.is_current(token) {
            debug!("Discarding stale refinement analysis for run {}", token.0);
            return;
        }

        let feedback = match self
            .service
            .analyze_schematic_preview(&original, &current_preview)
            .await
        {
            Ok(result) => result,
            Err(e) => return self.fail_refinement(token, e),
        };
        if !self.is_current(token) {
            debug!("Discarding stale refinement feedback for run {}", token.0);
            return;
        }

        let current_params = self.settings.get();
        let ctx = SuggestionContext {
            original_analysis: &original_analysis,
            preview_assessment: &feedback,
            current_params: &current_params,
            mode,
            iteration: round + 1,
        };
        let suggestion = match self.service.suggest_parameters(&ctx).await {
            Ok(result) => result,
            Err(e) => return self.fail_refinement(token, e),
        };

        let mut st = self.state.lock().unwrap();
        if st.token() != token {
            debug!("Discarding stale refinement suggestion for run {}", token.0);
            return;
        }
        st.refinement.loading = false;
        st.refinement.feedback = Some(feedback);
        st.refinement.suggestion = Some(suggestion);
    }

    fn fail_refinement(&self, token: RunToken, error: AiError) {
        let mut st = self.state.lock().unwrap();
        if st.token() != token {
            debug!("Dropping refinement error from stale run {}: {}", token.0, error);
            return;
        }
        warn!("Refinement analysis failed for run {}: {}", token.0, error);
        st.refinement.loading = false;
        st.refinement.error = Some(error.to_string());
    }

    /// Transition 8: apply the pending refinement suggestion. Captures a
    /// new baseline from the live settings, promotes the current preview
    /// to "before", increments the round, and re-enters pre-edit so the
    /// applied change is visible before the next generation.
    pub fn refine(&self) {
        let baseline = self.settings.get();
        let suggestion = {
            let mut st = self.state.lock().unwrap();
            let Some(suggestion) = st.refinement.suggestion.clone() else {
                return;
            };
            if st.refinement.round >= st.refinement.max_rounds {
                return;
            }
            st.refinement.open = false;
            st.refinement.error = None;
            st.refinement.feedback = None;
            st.refinement.suggestion = None;
            st.refinement.round += 1;
            st.pre_edit_active = true;
            st.suggestion = Some(suggestion.clone());
            st.baseline_settings = Some(baseline);
            st.preview_before = st.preview_current.clone();
            st.preview_after = None;
            info!("Applying refinement round {}", st.refinement.round);
            suggestion
        };
        self.settings.apply(&snapshot_from_suggestion(&suggestion));
    }

    /// Transition 9: keep the refined settings and close the panel. Does
    /// not reset the round counter.
    pub fn accept_final(&self) {
        self.state.lock().unwrap().refinement.open = false;
    }

    /// Close the refinement panel without acting on the suggestion.
    pub fn close_refinement_panel(&self) {
        self.state.lock().unwrap().refinement.open = false;
    }

    /// Transition 10: restore the settings captured when the image was
    /// loaded (not any intermediate refinement baseline), clear all
    /// analysis artifacts, zero the round counter, and start a fresh run.
    pub fn reset(&self) {
        let initial = self.state.lock().unwrap().initial_settings.clone();
        if let Some(snapshot) = initial {
            self.settings.apply(&snapshot);
        }

        let mut st = self.state.lock().unwrap();
        st.run_id += 1;
        st.refinement = RefinementSession::new(st.refinement.max_rounds);
        st.suggestion = None;
        st.original_analysis = None;
        st.preview_assessment = None;
        st.preview_before = None;
        st.preview_after = None;
        st.pre_edit_active = true;
        st.status = if st.enabled {
            AnalysisStatus::WaitingPreview
        } else {
            AnalysisStatus::Disabled
        };
        info!("Reset to image-load settings, starting run {}", st.run_id);
    }

    /// Transition 11: toggle the subsystem. Turning it off freezes at
    /// `Disabled` and leaves the live settings untouched; turning it on
    /// re-runs the image-load transition against the currently loaded
    /// image. With no key configured, enabling is refused for the session.
    pub fn set_enabled(&self, enabled: bool) {
        if enabled && !self.config_ok {
            warn!("Cannot enable AI suggestions: no API key configured");
            return;
        }

        {
            let mut st = self.state.lock().unwrap();
            st.enabled = enabled;
            st.refinement.open = false;
            if !enabled {
                st.status = AnalysisStatus::Disabled;
                st.pre_edit_active = false;
                info!("AI suggestions disabled");
                return;
            }
            st.status = AnalysisStatus::WaitingPreview;
            st.error = None;
            st.pre_edit_active = true;
            info!("AI suggestions enabled");
        }
        self.reload_current_image();
    }

    pub fn toggle_enabled(&self) {
        let enabled = self.state.lock().unwrap().enabled;
        self.set_enabled(!enabled);
    }

    /// Re-run the image-load transition against the already-converted
    /// image after re-enabling. No image loaded yet means there is
    /// nothing to restart; the run stays in `WaitingPreview`.
    fn reload_current_image(&self) {
        let initial = self.settings.get();
        let mut st = self.state.lock().unwrap();
        if st.original_image.is_none() {
            return;
        }
        let original_image = st.original_image.clone();
        st.begin_run(initial);
        st.original_image = original_image;
        st.status = AnalysisStatus::WaitingPreview;
        st.error = None;
        st.pre_edit_active = true;
        info!("Restarting analysis for the loaded image, run {}", st.run_id);
    }

    fn is_current(&self, token: RunToken) -> bool {
        self.state.lock().unwrap().token() == token
    }
}
