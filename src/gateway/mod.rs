//! Serialized, rate-limited, retrying gateway to the inference service.
//!
//! All outbound calls funnel through a single worker task that drains an
//! in-process queue in FIFO order, so at most one request is in flight at
//! any time and the cadence floor applies across every caller. The
//! last-dispatch timestamp lives inside the worker; nothing outside this
//! module can race on it.

pub mod types;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

use crate::error::AiError;

pub use self::types::{
    Content, GatewayReply, GenerateContentRequest, GenerationConfig, InlineData, Part,
    DEFAULT_MAX_RETRIES, DEFAULT_MIN_INTERVAL_MS,
};

/// Base delay for exponential backoff between retry attempts.
const BACKOFF_BASE_MS: u64 = 500;

/// Statuses worth retrying: rate limit and server-side overload.
const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Raw transport result: HTTP status plus the body decoded as JSON when
/// possible. An `Err` means the request failed below the HTTP layer.
pub struct WireResponse {
    pub status: u16,
    pub body: Option<Value>,
}

/// Seam between the gateway and the actual HTTP stack. Production uses
/// [`HttpTransport`]; tests script responses without a network.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, url: &str, body: &Value) -> Result<WireResponse, String>;
}

/// reqwest-backed transport with a 60 second request timeout.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to build reqwest client");
        Self { client }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, url: &str, body: &Value) -> Result<WireResponse, String> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    "generateContent request timed out after 60s".to_string()
                } else {
                    format!("generateContent request failed: {}", e)
                }
            })?;

        let status = response.status().as_u16();
        let body = response.json::<Value>().await.ok();
        Ok(WireResponse { status, body })
    }
}

struct Job {
    request: GenerateContentRequest,
    reply: oneshot::Sender<Result<GatewayReply, AiError>>,
}

/// FIFO request gateway. Cheap to share behind an `Arc`; every caller's
/// `submit` lands on the same queue.
pub struct RequestGateway {
    jobs: mpsc::UnboundedSender<Job>,
}

impl RequestGateway {
    /// Create a gateway backed by the real HTTP transport. Must be called
    /// from within a tokio runtime (the worker task is spawned here).
    pub fn new() -> Self {
        Self::with_transport(Arc::new(HttpTransport::new()))
    }

    /// Create a gateway over a custom transport.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        let (jobs, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(rx, transport));
        Self { jobs }
    }

    /// Submit a request. Calls are dispatched one at a time in submission
    /// order; transient failures are retried with exponential backoff.
    ///
    /// # Errors
    /// - [`AiError::MissingApiKey`] immediately when the request carries no
    ///   key (never enqueued, never retried).
    /// - [`AiError::Permanent`] for non-retryable service responses.
    /// - [`AiError::Transient`] once retries are exhausted.
    pub async fn submit(&self, request: GenerateContentRequest) -> Result<GatewayReply, AiError> {
        if request.api_key.as_deref().map_or(true, str::is_empty) {
            return Err(AiError::MissingApiKey);
        }

        let (reply, rx) = oneshot::channel();
        self.jobs
            .send(Job { request, reply })
            .map_err(|_| AiError::Permanent {
                message: "request gateway worker is gone".to_string(),
            })?;

        rx.await.map_err(|_| AiError::Permanent {
            message: "request gateway dropped the call".to_string(),
        })?
    }
}

impl Default for RequestGateway {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_worker(mut rx: mpsc::UnboundedReceiver<Job>, transport: Arc<dyn Transport>) {
    let mut last_dispatch: Option<Instant> = None;
    while let Some(job) = rx.recv().await {
        let result = execute(transport.as_ref(), &mut last_dispatch, &job.request).await;
        // The caller may have stopped waiting.
        let _ = job.reply.send(result);
    }
}

async fn execute(
    transport: &dyn Transport,
    last_dispatch: &mut Option<Instant>,
    request: &GenerateContentRequest,
) -> Result<GatewayReply, AiError> {
    let api_key = request.api_key.as_deref().unwrap_or_default();
    let url = endpoint_url(&request.model, api_key);
    let body = serde_json::json!({
        "contents": request.contents,
        "generationConfig": request.generation_config,
    });
    let min_interval = Duration::from_millis(request.min_interval_ms);

    let mut last_err: Option<AiError> = None;
    for attempt in 0..=request.max_retries {
        pace(last_dispatch, min_interval).await;

        match transport.send(&url, &body).await {
            Ok(response) if (200..300).contains(&response.status) => {
                return Ok(reply_from_body(response.body));
            }
            Ok(response) => {
                let message = server_message(&response.body).unwrap_or_else(|| {
                    format!("generateContent failed with status {}", response.status)
                });
                if !RETRYABLE_STATUSES.contains(&response.status) {
                    warn!(
                        "Permanent service error (status {}): {}",
                        response.status, message
                    );
                    return Err(AiError::Permanent { message });
                }
                info!(
                    "Transient service error on attempt {} (status {}): {}",
                    attempt + 1,
                    response.status,
                    message
                );
                last_err = Some(AiError::Transient {
                    status: Some(response.status),
                    message,
                });
            }
            Err(message) => {
                info!("Network failure on attempt {}: {}", attempt + 1, message);
                last_err = Some(AiError::Transient {
                    status: None,
                    message,
                });
            }
        }

        if attempt < request.max_retries {
            sleep(Duration::from_millis(BACKOFF_BASE_MS * (1u64 << attempt))).await;
        }
    }

    warn!("Retries exhausted after {} attempts", request.max_retries + 1);
    Err(last_err.unwrap_or(AiError::Transient {
        status: None,
        message: "generateContent failed".to_string(),
    }))
}

/// Wait until at least `min_interval` has passed since the previous
/// dispatch, then stamp the new dispatch time.
async fn pace(last_dispatch: &mut Option<Instant>, min_interval: Duration) {
    if let Some(previous) = *last_dispatch {
        let earliest = previous + min_interval;
        let now = Instant::now();
        if earliest > now {
            sleep(earliest - now).await;
        }
    }
    *last_dispatch = Some(Instant::now());
}

fn endpoint_url(model: &str, api_key: &str) -> String {
    format!(
        "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
        urlencoding::encode(model),
        urlencoding::encode(api_key)
    )
}

/// Pull the server-provided error message out of a failure body, which is
/// either `{error: {message}}` or occasionally a bare string.
fn server_message(body: &Option<Value>) -> Option<String> {
    let body = body.as_ref()?;
    if let Some(text) = body.as_str() {
        return Some(text.to_string());
    }
    body["error"]["message"].as_str().map(str::to_string)
}

/// Concatenate the text parts of the first candidate. A body without
/// candidates yields an empty string, not an error; callers that require
/// JSON fail later in extraction.
fn reply_from_body(body: Option<Value>) -> GatewayReply {
    let raw = body.unwrap_or(Value::Null);
    let text = raw["candidates"][0]["content"]["parts"]
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .map(|p| p["text"].as_str().unwrap_or_default())
                .collect::<String>()
        })
        .unwrap_or_default();
    GatewayReply { text, raw }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Transport that pops scripted results and records each dispatch with
    /// its (virtual) timestamp.
    struct ScriptedTransport {
        script: Mutex<VecDeque<Result<WireResponse, String>>>,
        dispatches: Mutex<Vec<(String, Instant)>>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<WireResponse, String>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                dispatches: Mutex::new(Vec::new()),
            })
        }

        fn dispatch_log(&self) -> Vec<(String, Instant)> {
            self.dispatches.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, url: &str, _body: &Value) -> Result<WireResponse, String> {
            self.dispatches
                .lock()
                .unwrap()
                .push((url.to_string(), Instant::now()));
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .expect("transport called more times than scripted")
        }
    }

    fn ok_response(text: &str) -> Result<WireResponse, String> {
        Ok(WireResponse {
            status: 200,
            body: Some(serde_json::json!({
                "candidates": [{"content": {"parts": [{"text": text}]}}]
            })),
        })
    }

    fn status_response(status: u16, message: &str) -> Result<WireResponse, String> {
        Ok(WireResponse {
            status,
            body: Some(serde_json::json!({"error": {"message": message}})),
        })
    }

    fn request(model: &str) -> GenerateContentRequest {
        GenerateContentRequest {
            model: model.to_string(),
            api_key: Some("test-key".to_string()),
            contents: vec![Content::user(vec![Part::text("hello")])],
            generation_config: GenerationConfig {
                temperature: 0.2,
                max_output_tokens: 512,
            },
            min_interval_ms: DEFAULT_MIN_INTERVAL_MS,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_without_dispatch() {
        let transport = ScriptedTransport::new(vec![]);
        let gateway = RequestGateway::with_transport(transport.clone());

        let mut req = request("gemini-2.0-flash");
        req.api_key = None;
        let err = gateway.submit(req).await.unwrap_err();
        assert!(matches!(err, AiError::MissingApiKey));

        let mut req = request("gemini-2.0-flash");
        req.api_key = Some(String::new());
        let err = gateway.submit(req).await.unwrap_err();
        assert!(matches!(err, AiError::MissingApiKey));

        assert!(transport.dispatch_log().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fifo_dispatch_order_and_cadence() {
        let transport = ScriptedTransport::new(vec![
            ok_response("one"),
            ok_response("two"),
            ok_response("three"),
        ]);
        let gateway = RequestGateway::with_transport(transport.clone());

        let (r1, r2, r3) = tokio::join!(
            gateway.submit(request("model-a")),
            gateway.submit(request("model-b")),
            gateway.submit(request("model-c")),
        );
        assert_eq!(r1.unwrap().text, "one");
        assert_eq!(r2.unwrap().text, "two");
        assert_eq!(r3.unwrap().text, "three");

        let log = transport.dispatch_log();
        assert_eq!(log.len(), 3);
        assert!(log[0].0.contains("model-a"));
        assert!(log[1].0.contains("model-b"));
        assert!(log[2].0.contains("model-c"));

        for pair in log.windows(2) {
            let gap = pair[1].1 - pair[0].1;
            assert!(
                gap >= Duration::from_millis(DEFAULT_MIN_INTERVAL_MS),
                "dispatch gap {:?} below the cadence floor",
                gap
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_retry_then_succeed() {
        let transport = ScriptedTransport::new(vec![
            status_response(503, "overloaded"),
            status_response(503, "overloaded"),
            ok_response("recovered"),
        ]);
        let gateway = RequestGateway::with_transport(transport.clone());

        let started = Instant::now();
        let reply = gateway.submit(request("gemini-2.0-flash")).await.unwrap();
        assert_eq!(reply.text, "recovered");

        let log = transport.dispatch_log();
        assert_eq!(log.len(), 3, "expected exactly 3 attempts");

        // Two backoffs of 500ms and 1000ms on top of the cadence floor.
        let elapsed = Instant::now() - started;
        assert!(
            elapsed >= Duration::from_millis(1500),
            "elapsed {:?} shorter than the mandatory backoff",
            elapsed
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_failures_count_as_transient() {
        let transport = ScriptedTransport::new(vec![
            Err("connection reset".to_string()),
            ok_response("after network blip"),
        ]);
        let gateway = RequestGateway::with_transport(transport);

        let reply = gateway.submit(request("gemini-2.0-flash")).await.unwrap();
        assert_eq!(reply.text, "after network blip");
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_exhausted_returns_last_error() {
        let transport = ScriptedTransport::new(vec![
            status_response(429, "slow down"),
            status_response(429, "slow down"),
            status_response(429, "slow down"),
            status_response(429, "really, slow down"),
        ]);
        let gateway = RequestGateway::with_transport(transport.clone());

        let err = gateway.submit(request("gemini-2.0-flash")).await.unwrap_err();
        match err {
            AiError::Transient { status, message } => {
                assert_eq!(status, Some(429));
                assert_eq!(message, "really, slow down");
            }
            other => panic!("expected transient error, got {:?}", other),
        }
        assert_eq!(transport.dispatch_log().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_fails_immediately_with_server_message() {
        let transport =
            ScriptedTransport::new(vec![status_response(400, "API key not valid")]);
        let gateway = RequestGateway::with_transport(transport.clone());

        let err = gateway.submit(request("gemini-2.0-flash")).await.unwrap_err();
        match err {
            AiError::Permanent { message } => assert_eq!(message, "API key not valid"),
            other => panic!("expected permanent error, got {:?}", other),
        }
        assert_eq!(transport.dispatch_log().len(), 1, "permanent errors never retry");
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_line_used_when_body_has_no_message() {
        let transport = ScriptedTransport::new(vec![Ok(WireResponse {
            status: 400,
            body: None,
        })]);
        let gateway = RequestGateway::with_transport(transport);

        let err = gateway.submit(request("gemini-2.0-flash")).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "generateContent failed with status 400"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_concatenates_parts_and_keeps_raw_body() {
        let body = serde_json::json!({
            "candidates": [{"content": {"parts": [
                {"text": "{\"a\":"},
                {"text": "1}"},
                {"notText": true}
            ]}}],
            "usageMetadata": {"totalTokenCount": 42}
        });
        let transport = ScriptedTransport::new(vec![Ok(WireResponse {
            status: 200,
            body: Some(body.clone()),
        })]);
        let gateway = RequestGateway::with_transport(transport);

        let reply = gateway.submit(request("gemini-2.0-flash")).await.unwrap();
        assert_eq!(reply.text, "{\"a\":1}");
        assert_eq!(reply.raw, body);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_candidates_yield_empty_text() {
        let transport = ScriptedTransport::new(vec![Ok(WireResponse {
            status: 200,
            body: Some(serde_json::json!({})),
        })]);
        let gateway = RequestGateway::with_transport(transport);

        let reply = gateway.submit(request("gemini-2.0-flash")).await.unwrap();
        assert_eq!(reply.text, "");
    }

    #[test]
    fn test_endpoint_url_encodes_segments() {
        let url = endpoint_url("gemini-2.0-flash", "key/with?chars");
        assert!(url.starts_with(
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent?key="
        ));
        assert!(url.contains("key%2Fwith%3Fchars"));
    }
}
