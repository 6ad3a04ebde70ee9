//! API key and model resolution from the process environment.
//!
//! The host application owns configuration loading; this module only reads
//! the two recognized environment variable names. A missing key disables
//! the subsystem for the session, it is never fatal to the host.

use std::env;

/// Preferred environment variable for the Gemini API key.
pub const ENV_API_KEY: &str = "MAPART_AI_GEMINI_API_KEY";
/// Fallback environment variable, for hosts that already export a key
/// under the provider's conventional name.
pub const ENV_API_KEY_FALLBACK: &str = "GEMINI_API_KEY";

/// Model used for all analysis and suggestion calls.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Resolve the Gemini API key, preferring `MAPART_AI_GEMINI_API_KEY` over
/// `GEMINI_API_KEY`. Empty values count as absent.
pub fn gemini_api_key() -> Option<String> {
    env::var(ENV_API_KEY)
        .ok()
        .filter(|v| !v.is_empty())
        .or_else(|| env::var(ENV_API_KEY_FALLBACK).ok().filter(|v| !v.is_empty()))
}

/// Whether a usable API key is present in the environment.
pub fn has_api_key() -> bool {
    gemini_api_key().is_some()
}
