//! Editable-settings snapshots and the live settings store interface.
//!
//! Snapshots are value objects: captured by copy, compared structurally,
//! never aliased, so a rollback cannot be corrupted by later edits. The
//! store itself belongs to the host application; this module only defines
//! the interface the orchestrator drives.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::suggestion::{DitherMethod, ParameterSuggestion, SupportPlacement};

/// The editable conversion settings at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterSnapshot {
    pub dithering: DitherMethod,
    pub scale_factor: f64,
    pub preprocessing_enabled: bool,
    pub blur_px: f64,
    pub sharpen: f64,
    pub brightness: f64,
    pub contrast: f64,
    pub saturation: f64,
    pub transparency_enabled: bool,
    pub transparency_tolerance: f64,
    pub where_support_blocks: SupportPlacement,
    pub support_block: String,
}

impl Default for ParameterSnapshot {
    fn default() -> Self {
        Self {
            dithering: DitherMethod::FloydSteinberg,
            scale_factor: 1.0,
            preprocessing_enabled: false,
            blur_px: 0.0,
            sharpen: 0.0,
            brightness: 100.0,
            contrast: 100.0,
            saturation: 100.0,
            transparency_enabled: false,
            transparency_tolerance: 128.0,
            where_support_blocks: SupportPlacement::AllOptimized,
            support_block: "cobblestone".to_string(),
        }
    }
}

/// Map a canonical suggestion onto a full snapshot. Suggestions cover
/// every editable field, so nothing is carried over from previous state.
pub fn snapshot_from_suggestion(suggestion: &ParameterSuggestion) -> ParameterSnapshot {
    ParameterSnapshot {
        dithering: suggestion.dithering.method,
        scale_factor: suggestion.scale_factor.value,
        preprocessing_enabled: suggestion.preprocessing.enabled,
        blur_px: suggestion.preprocessing.blur_px,
        sharpen: suggestion.preprocessing.sharpen,
        brightness: suggestion.preprocessing.brightness,
        contrast: suggestion.preprocessing.contrast,
        saturation: suggestion.preprocessing.saturation,
        transparency_enabled: suggestion.transparency.enabled,
        transparency_tolerance: suggestion.transparency.tolerance,
        where_support_blocks: suggestion.support_blocks.placement,
        support_block: suggestion.support_blocks.support_block.clone(),
    }
}

/// Live settings store owned by the host. The orchestrator is the only
/// component in this crate that calls it, and it assumes nothing about
/// the host's internal representation beyond these two operations.
pub trait SettingsStore: Send + Sync {
    fn get(&self) -> ParameterSnapshot;
    fn apply(&self, snapshot: &ParameterSnapshot);
}

/// Simple in-memory store, used in tests and by headless hosts.
pub struct MemorySettingsStore {
    current: Mutex<ParameterSnapshot>,
}

impl MemorySettingsStore {
    pub fn new(initial: ParameterSnapshot) -> Self {
        Self {
            current: Mutex::new(initial),
        }
    }
}

impl Default for MemorySettingsStore {
    fn default() -> Self {
        Self::new(ParameterSnapshot::default())
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self) -> ParameterSnapshot {
        self.current.lock().unwrap().clone()
    }

    fn apply(&self, snapshot: &ParameterSnapshot) {
        *self.current.lock().unwrap() = snapshot.clone();
    }
}
