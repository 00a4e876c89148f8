//! Core `VisionClient` trait and `ApiVisionClient` implementation.
//!
//! `ApiVisionClient` calls any OpenAI-compatible `/v1/chat/completions`
//! endpoint with an image attachment, classifies failures into
//! [`AnalysisError`], and retries transient ones with exponential backoff
//! (3 total attempts, 1 s base delay).  Successful payloads go through
//! [`parse_analysis`], which never fails — malformed content degrades to the
//! parser's fallback instead of triggering another network call.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use thiserror::Error;

use crate::config::{AppConfig, VisionConfig};
use crate::vision::model::Analysis;
use crate::vision::parser::{fallback_analysis, parse_analysis};

// ---------------------------------------------------------------------------
// AnalysisError
// ---------------------------------------------------------------------------

/// Classified failures of the vision-analysis call.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Missing or rejected API key.  Never retried — credentials won't
    /// self-heal.
    #[error("invalid or missing API key")]
    Auth,

    /// The service rejected the call with HTTP 429.
    #[error("rate limit exceeded")]
    RateLimit,

    /// The service answered with a 5xx status.
    #[error("vision service error (HTTP {0})")]
    Server(u16),

    /// The HTTP response body did not match the expected envelope.  Not
    /// retried — the content (or lack of it) goes to the parser's fallback.
    #[error("malformed vision response: {0}")]
    MalformedResponse(String),

    /// Transport or connection failure.
    #[error("network error: {0}")]
    Network(String),

    /// The request did not complete within the configured timeout.
    #[error("vision request timed out")]
    Timeout,

    /// All retry attempts were spent; wraps the last classified error.
    #[error("vision analysis failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<AnalysisError>,
    },
}

impl AnalysisError {
    /// Whether the retry loop may attempt the call again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AnalysisError::RateLimit
                | AnalysisError::Server(_)
                | AnalysisError::Network(_)
                | AnalysisError::Timeout
        )
    }

    /// Actionable text shown to the user when the operation fails.
    pub fn user_message(&self) -> String {
        match self {
            AnalysisError::Auth => {
                "API key not configured or invalid. Please add your API key in settings.".into()
            }
            AnalysisError::RateLimit => {
                "API rate limit exceeded. Please wait a moment and try again.".into()
            }
            AnalysisError::RetriesExhausted { last, .. } => last.user_message(),
            other => format!("Failed to analyze manga page: {other}"),
        }
    }
}

impl From<reqwest::Error> for AnalysisError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AnalysisError::Timeout
        } else {
            AnalysisError::Network(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Retry schedule (pure, independently testable)
// ---------------------------------------------------------------------------

/// Total attempt budget, first call included.
pub const MAX_ATTEMPTS: u32 = 3;

/// Base delay before the first retry.
pub const BASE_DELAY_MS: u64 = 1_000;

/// Delay inserted before retry number `attempt` (1-based count of completed
/// attempts): `base * 2^(attempt-1)`.
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(BASE_DELAY_MS * 2u64.pow(attempt.saturating_sub(1)))
}

/// Drive `attempt_fn` until it succeeds, a non-retryable error surfaces, or
/// the attempt budget is spent.
async fn retry_with_backoff<F, Fut, T>(mut attempt_fn: F) -> Result<T, AnalysisError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AnalysisError>>,
{
    let mut last: Option<AnalysisError> = None;

    for attempt in 1..=MAX_ATTEMPTS {
        match attempt_fn().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => {
                log::warn!("vision analysis attempt {attempt}/{MAX_ATTEMPTS} failed: {e}");
                last = Some(e);
                if attempt < MAX_ATTEMPTS {
                    let delay = backoff_delay(attempt);
                    log::info!("retrying in {} ms", delay.as_millis());
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    Err(AnalysisError::RetriesExhausted {
        attempts: MAX_ATTEMPTS,
        last: Box::new(last.unwrap_or(AnalysisError::Timeout)),
    })
}

// ---------------------------------------------------------------------------
// VisionClient trait
// ---------------------------------------------------------------------------

/// Async interface to the vision-analysis service.
///
/// Implementors must be `Send + Sync` so they can be shared across tasks
/// behind an `Arc<dyn VisionClient>`.
#[async_trait]
pub trait VisionClient: Send + Sync {
    /// Analyze a captured page image and return the structured result.
    async fn analyze(&self, image: &[u8]) -> Result<Analysis, AnalysisError>;
}

// ---------------------------------------------------------------------------
// ApiVisionClient
// ---------------------------------------------------------------------------

/// The structured prompt sent alongside each page image.
const ANALYSIS_PROMPT: &str = r#"You are analyzing a manga page. Please provide a detailed analysis in the following JSON format:

{
  "overallScene": "Brief description of the overall scene and atmosphere",
  "readingOrder": [0, 1, 2, ...],
  "panels": [
    {
      "id": 0,
      "setting": "Description of the panel's setting/background",
      "characters": [
        {
          "description": "Character appearance and identity",
          "position": "Where they are in the panel",
          "expression": "Facial expression and body language",
          "gender": "male or female",
          "isSpeaking": true
        }
      ],
      "actions": ["Action 1", "Action 2"],
      "emotions": ["Emotion 1", "Emotion 2"],
      "dialogue": ["Dialogue line 1", "Dialogue line 2"]
    }
  ]
}

Instructions:
1. Identify all manga panels in the image
2. Determine the reading order (typically right-to-left, top-to-bottom for Japanese manga)
3. For each panel, describe the setting, all visible characters, actions, emotions, and any readable dialogue
4. For characters: identify their gender (male/female) and mark "isSpeaking": true for the character speaking the dialogue
5. For dialogue: extract the text EXACTLY as written in the manga. Use casual, natural language.
6. Provide the overall scene context

Return ONLY the JSON object, no additional text."#;

/// Calls an OpenAI-compatible `/v1/chat/completions` endpoint with the page
/// image attached as a base64 data URL.
///
/// All connection details (`base_url`, `model`, timeouts) come from
/// [`VisionConfig`]; the API key comes from the top-level settings.
pub struct ApiVisionClient {
    client: reqwest::Client,
    config: VisionConfig,
    api_key: Option<String>,
}

impl ApiVisionClient {
    /// Build an `ApiVisionClient` from application config.
    ///
    /// The HTTP client is pre-configured with the per-request timeout from
    /// `config.vision.timeout_secs`.
    pub fn from_config(config: &AppConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.vision.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.vision.clone(),
            api_key: config
                .api_key
                .as_deref()
                .filter(|k| !k.is_empty())
                .map(str::to_string),
        }
    }

    /// One network attempt: send the image, classify any failure, extract the
    /// raw content text from the response envelope.
    async fn request_analysis(&self, image: &[u8], key: &str) -> Result<String, AnalysisError> {
        let data_url = format!(
            "data:image/jpeg;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(image)
        );

        let url = format!("{}/v1/chat/completions", self.config.base_url);

        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": ANALYSIS_PROMPT },
                    { "type": "image_url", "image_url": { "url": data_url, "detail": "high" } }
                ]
            }],
            "max_tokens": 2000,
            "temperature": 0.7
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(match status.as_u16() {
                401 | 403 => AnalysisError::Auth,
                429 => AnalysisError::RateLimit,
                code if code >= 500 => AnalysisError::Server(code),
                code => AnalysisError::Network(format!("unexpected HTTP status {code}")),
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))?;

        json["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                AnalysisError::MalformedResponse("response has no message content".into())
            })
    }
}

#[async_trait]
impl VisionClient for ApiVisionClient {
    /// Analyze the image with bounded retry.
    ///
    /// A missing API key fails immediately as [`AnalysisError::Auth`] with no
    /// network call.  A malformed response envelope is absorbed into the
    /// parser's fallback analysis rather than retried or propagated.  Wall
    /// time above the configured target is a logged warning, not a failure.
    async fn analyze(&self, image: &[u8]) -> Result<Analysis, AnalysisError> {
        let key = self.api_key.as_deref().ok_or(AnalysisError::Auth)?;

        let start = std::time::Instant::now();

        let raw_text = match retry_with_backoff(move || self.request_analysis(image, key)).await {
            Ok(text) => text,
            Err(AnalysisError::MalformedResponse(reason)) => {
                log::warn!("vision response envelope unusable ({reason}); using fallback analysis");
                return Ok(fallback_analysis());
            }
            Err(e) => return Err(e),
        };

        let elapsed = start.elapsed();
        if elapsed.as_millis() as u64 > self.config.timing_target_ms {
            log::warn!(
                "analysis took {} ms, exceeding the {} ms target",
                elapsed.as_millis(),
                self.config.timing_target_ms
            );
        } else {
            log::debug!("analysis completed in {} ms", elapsed.as_millis());
        }

        Ok(parse_analysis(&raw_text))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn make_config(api_key: Option<&str>) -> AppConfig {
        AppConfig {
            api_key: api_key.map(str::to_string),
            ..AppConfig::default()
        }
    }

    // ---- backoff schedule ---

    #[test]
    fn backoff_doubles_per_attempt() {
        assert_eq!(backoff_delay(1), Duration::from_millis(1_000));
        assert_eq!(backoff_delay(2), Duration::from_millis(2_000));
        assert_eq!(backoff_delay(3), Duration::from_millis(4_000));
    }

    #[test]
    fn attempt_budget_is_three() {
        assert_eq!(MAX_ATTEMPTS, 3);
    }

    // ---- error classification ---

    #[test]
    fn auth_is_not_retryable() {
        assert!(!AnalysisError::Auth.is_retryable());
    }

    #[test]
    fn malformed_response_is_not_retryable() {
        assert!(!AnalysisError::MalformedResponse("x".into()).is_retryable());
    }

    #[test]
    fn transient_errors_are_retryable() {
        assert!(AnalysisError::RateLimit.is_retryable());
        assert!(AnalysisError::Server(503).is_retryable());
        assert!(AnalysisError::Network("refused".into()).is_retryable());
        assert!(AnalysisError::Timeout.is_retryable());
    }

    #[test]
    fn user_messages_are_actionable() {
        assert!(AnalysisError::Auth.user_message().contains("API key"));
        assert!(AnalysisError::RateLimit.user_message().contains("wait"));

        // Exhausted retries surface the last error's guidance.
        let exhausted = AnalysisError::RetriesExhausted {
            attempts: 3,
            last: Box::new(AnalysisError::RateLimit),
        };
        assert!(exhausted.user_message().contains("wait"));
    }

    #[test]
    fn exhausted_error_names_attempt_count() {
        let e = AnalysisError::RetriesExhausted {
            attempts: 3,
            last: Box::new(AnalysisError::Timeout),
        };
        assert!(e.to_string().contains("failed after 3 attempts"));
    }

    // ---- retry loop (paused clock) ---

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_third_attempt_with_backoff_delays() {
        let calls = AtomicU32::new(0);
        let start = tokio::time::Instant::now();

        let result = retry_with_backoff(|| {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(AnalysisError::Server(500))
                } else {
                    Ok("payload".to_string())
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "payload");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1000 ms before attempt 2, 2000 ms before attempt 3.
        assert_eq!(start.elapsed(), Duration::from_millis(3_000));
    }

    #[tokio::test(start_paused = true)]
    async fn three_failures_exhaust_the_budget() {
        let calls = AtomicU32::new(0);

        let result: Result<String, _> = retry_with_backoff(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(AnalysisError::Network("refused".into())) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let err = result.unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::RetriesExhausted { attempts: 3, .. }
        ));
        assert!(err.to_string().contains("failed after 3 attempts"));
    }

    #[tokio::test]
    async fn auth_failure_never_retries() {
        let calls = AtomicU32::new(0);

        let result: Result<String, _> = retry_with_backoff(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(AnalysisError::Auth) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result.unwrap_err(), AnalysisError::Auth));
    }

    #[tokio::test]
    async fn malformed_response_never_retries() {
        let calls = AtomicU32::new(0);

        let result: Result<String, _> = retry_with_backoff(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(AnalysisError::MalformedResponse("no content".into())) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(
            result.unwrap_err(),
            AnalysisError::MalformedResponse(_)
        ));
    }

    // ---- missing API key ---

    #[tokio::test]
    async fn missing_api_key_fails_immediately_as_auth() {
        let client = ApiVisionClient::from_config(&make_config(None));
        let err = client.analyze(&[0u8; 4]).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Auth));
    }

    #[tokio::test]
    async fn empty_api_key_counts_as_missing() {
        let client = ApiVisionClient::from_config(&make_config(Some("")));
        let err = client.analyze(&[0u8; 4]).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Auth));
    }

    // ---- object safety ---

    #[test]
    fn vision_client_is_object_safe() {
        let client: Box<dyn VisionClient> =
            Box::new(ApiVisionClient::from_config(&make_config(Some("sk-test"))));
        drop(client);
    }
}
