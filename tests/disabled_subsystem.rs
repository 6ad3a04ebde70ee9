//! Behavior with no API key in the environment: the subsystem disables
//! itself for the whole session and stays inert. Kept in its own test
//! binary so clearing the environment cannot race other tests.

use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat};
use serde_json::Value;

use mapart_ai::analysis::AnalysisService;
use mapart_ai::config;
use mapart_ai::gateway::{RequestGateway, Transport, WireResponse};
use mapart_ai::settings::{MemorySettingsStore, SettingsStore};
use mapart_ai::{AnalysisOrchestrator, AnalysisStatus, MapMode};

struct RejectingTransport;

#[async_trait]
impl Transport for RejectingTransport {
    async fn send(&self, _url: &str, _body: &Value) -> Result<WireResponse, String> {
        panic!("the disabled subsystem must never dispatch a request");
    }
}

fn png_bytes() -> Vec<u8> {
    let img = DynamicImage::new_rgb8(64, 64);
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Png).unwrap();
    buffer.into_inner()
}

#[tokio::test]
async fn test_missing_key_disables_the_session_permanently() {
    std::env::remove_var(config::ENV_API_KEY);
    std::env::remove_var(config::ENV_API_KEY_FALLBACK);

    let gateway = Arc::new(RequestGateway::with_transport(Arc::new(RejectingTransport)));
    let service = AnalysisService::new(gateway);
    let store = Arc::new(MemorySettingsStore::default());
    let orchestrator = AnalysisOrchestrator::new(service, store.clone(), MapMode::Nbt);

    let overview = orchestrator.overview();
    assert!(!overview.enabled);
    assert_eq!(overview.run.status, AnalysisStatus::Disabled);
    assert!(overview
        .error
        .as_deref()
        .unwrap()
        .contains("Missing Gemini API key"));
    assert!(!overview.pre_edit_active);

    // Loading an image still captures snapshots but stays disabled, and
    // no event reaches the network.
    let before = store.get();
    orchestrator.load_image(&png_bytes());
    assert_eq!(orchestrator.status(), AnalysisStatus::Disabled);
    orchestrator
        .preview_rendered("data:image/png;base64,UFJFVklFVw==".to_string())
        .await;
    orchestrator.generation_complete().await;
    assert_eq!(orchestrator.status(), AnalysisStatus::Disabled);
    assert_eq!(store.get(), before);

    // Enabling is refused for the session; the key check happened once at
    // construction.
    orchestrator.set_enabled(true);
    assert_eq!(orchestrator.status(), AnalysisStatus::Disabled);
    assert!(!orchestrator.overview().enabled);

    orchestrator.toggle_enabled();
    assert_eq!(orchestrator.status(), AnalysisStatus::Disabled);
}
