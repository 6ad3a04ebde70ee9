//! AI parameter suggestion engine for image-to-map-art conversion.
//!
//! Orchestrates calls to a multimodal inference service to suggest and
//! apply conversion parameters: a serialized, rate-limited, retrying
//! request gateway; a two-stage analysis pipeline; a total normalizer
//! for untrusted model output; and a run-lifecycle state machine with
//! cooperative cancellation, snapshot rollback, and a bounded refinement
//! loop. The conversion engine, palette model, and UI are host concerns,
//! reached only through the interfaces in `settings` and the orchestrator
//! event methods.

pub mod analysis;
pub mod capture;
pub mod config;
pub mod error;
pub mod gateway;
pub mod orchestrator;
pub mod settings;
pub mod suggestion;

pub use analysis::{AnalysisResult, AnalysisService, MapMode, PreviewAssessment};
pub use error::AiError;
pub use gateway::RequestGateway;
pub use orchestrator::{AiOverview, AnalysisOrchestrator, AnalysisStatus, MAX_REFINEMENT_ROUNDS};
pub use settings::{MemorySettingsStore, ParameterSnapshot, SettingsStore};
pub use suggestion::{normalize, ParameterSuggestion};
