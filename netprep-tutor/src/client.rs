//! HTTP client for the generative-language endpoint
//!
//! Thin reqwest wrapper around `generateContent` and its SSE streaming
//! variant. Responsible for authentication, the status-to-error mapping,
//! the client-side timeout, and the optional retry-once policy; everything
//! above the wire (continuation, normalization, caching) lives in
//! [`crate::pipeline`].

use crate::config::TutorConfig;
use crate::error::{Result, TutorError};
use crate::types::{
    ApiErrorBody, FinishReason, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
};
use futures::stream::{self, Stream, StreamExt};
use reqwest::StatusCode;
use std::pin::Pin;
use tracing::{debug, warn};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Outcome of one buffered generation call
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub text: String,
    pub finish_reason: Option<FinishReason>,
}

impl GenerationOutcome {
    /// True when the model stopped because the token budget ran out.
    pub fn is_truncated(&self) -> bool {
        self.finish_reason == Some(FinishReason::MaxTokens)
    }
}

/// One chunk from the streaming endpoint. The finish reason arrives on the
/// final chunk only.
#[derive(Debug, Clone)]
pub struct StreamDelta {
    pub text: String,
    pub finish_reason: Option<FinishReason>,
}

/// Boxed stream of text deltas
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<StreamDelta>> + Send>>;

/// Client for the generative-language HTTP endpoint
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout_seconds: u64,
    retry_once: bool,
}

impl GeminiClient {
    /// Create a client from configuration.
    ///
    /// Fails with [`TutorError::ConfigError`] when the API key is empty;
    /// that condition is fatal for the whole feature and never retried.
    pub fn new(config: &TutorConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(TutorError::ConfigError(
                "api key must not be empty".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TutorError::ConnectionError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.clone(),
            timeout_seconds: config.request_timeout.as_secs(),
            retry_once: config.retry_once_on_server_error,
        })
    }

    /// Model identifier this client calls.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Issue one buffered generation call.
    ///
    /// Applies the retry-once policy for 5xx and transport failures when
    /// enabled; 4xx responses and timeouts surface immediately.
    pub async fn generate(
        &self,
        prompt: &str,
        generation: GenerationConfig,
    ) -> Result<GenerationOutcome> {
        let request = GenerateContentRequest::from_prompt(prompt, generation);

        match self.generate_once(&request).await {
            Ok(outcome) => Ok(outcome),
            Err(e) if self.retry_once && e.is_retryable() => {
                warn!("Upstream call failed, retrying once: {}", e);
                self.generate_once(&request).await
            }
            Err(e) => Err(e),
        }
    }

    async fn generate_once(&self, request: &GenerateContentRequest) -> Result<GenerationOutcome> {
        let url = self.endpoint("generateContent");
        debug!("POST {}", url);

        let response = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e, "generateContent"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.error_from_status(status, response).await);
        }

        let body: GenerateContentResponse = response.json().await.map_err(|e| {
            TutorError::SerializationError(format!("failed to parse generateContent response: {}", e))
        })?;

        debug!(
            "Generation finished: {} chars, finish reason {:?}",
            body.text().len(),
            body.finish_reason()
        );

        Ok(GenerationOutcome {
            text: body.text(),
            finish_reason: body.finish_reason(),
        })
    }

    /// Issue one streaming generation call and return the delta stream.
    ///
    /// Upstream errors before the first byte surface as a `Result::Err`
    /// here; failures mid-stream arrive as an `Err` item on the stream.
    pub async fn stream_generate(
        &self,
        prompt: &str,
        generation: GenerationConfig,
    ) -> Result<DeltaStream> {
        let request = GenerateContentRequest::from_prompt(prompt, generation);
        let url = format!("{}?alt=sse", self.endpoint("streamGenerateContent"));
        debug!("POST {} (streaming)", url);

        let response = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e, "streamGenerateContent"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.error_from_status(status, response).await);
        }

        let timeout_seconds = self.timeout_seconds;
        let bytes = response.bytes_stream();

        // Reassemble SSE lines from the byte stream and parse each
        // `data:` payload as a response chunk. Transport chunks can split
        // a multi-byte character, so raw bytes are carried until they
        // decode as UTF-8.
        let deltas = stream::unfold(
            (bytes, Vec::new(), String::new(), false),
            move |(mut bytes, mut carry, mut buffer, mut done)| async move {
                loop {
                    while let Some(pos) = buffer.find('\n') {
                        let line: String = buffer.drain(..=pos).collect();
                        if let Some(item) = parse_sse_line(line.trim_end()) {
                            return Some((item, (bytes, carry, buffer, done)));
                        }
                    }

                    if done {
                        return None;
                    }

                    match bytes.next().await {
                        Some(Ok(chunk)) => {
                            carry.extend_from_slice(&chunk);
                            drain_complete_utf8(&mut carry, &mut buffer);
                        }
                        Some(Err(e)) => {
                            done = true;
                            let err = if e.is_timeout() {
                                TutorError::TimeoutError {
                                    timeout_seconds,
                                    context: "streamGenerateContent".to_string(),
                                }
                            } else {
                                TutorError::ConnectionError(e.to_string())
                            };
                            return Some((Err(err), (bytes, carry, buffer, done)));
                        }
                        None => {
                            done = true;

                            // A close without a trailing newline leaves the
                            // last data line unterminated in the buffer.
                            buffer.push_str(&String::from_utf8_lossy(&carry));
                            carry.clear();
                            let tail: String = buffer.drain(..).collect();
                            if let Some(item) = parse_sse_line(tail.trim_end()) {
                                return Some((item, (bytes, carry, buffer, done)));
                            }
                        }
                    }
                }
            },
        );

        Ok(Box::pin(deltas))
    }

    fn endpoint(&self, verb: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, self.model, verb)
    }

    fn map_transport_error(&self, e: reqwest::Error, context: &str) -> TutorError {
        if e.is_timeout() {
            TutorError::TimeoutError {
                timeout_seconds: self.timeout_seconds,
                context: context.to_string(),
            }
        } else if e.is_connect() {
            TutorError::ConnectionError(format!("unable to reach {}: {}", self.base_url, e))
        } else {
            TutorError::ConnectionError(e.to_string())
        }
    }

    async fn error_from_status(&self, status: StatusCode, response: reqwest::Response) -> TutorError {
        let body = response.text().await.unwrap_or_default();

        // The endpoint wraps failures in an error envelope; fall back to
        // the raw body when it does not parse.
        let detail = match serde_json::from_str::<ApiErrorBody>(&body) {
            Ok(parsed) if !parsed.error.message.is_empty() => parsed.error.message,
            _ if body.trim().is_empty() => status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string(),
            _ => body,
        };

        TutorError::GenerationFailed {
            status: status.as_u16(),
            detail,
        }
    }
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Move the longest valid UTF-8 prefix of `bytes` into `text`. A trailing
/// incomplete sequence stays in `bytes` for the next chunk; genuinely
/// invalid bytes become U+FFFD.
fn drain_complete_utf8(bytes: &mut Vec<u8>, text: &mut String) {
    loop {
        match std::str::from_utf8(bytes) {
            Ok(valid) => {
                text.push_str(valid);
                bytes.clear();
                return;
            }
            Err(e) => {
                let valid_len = e.valid_up_to();
                text.push_str(&String::from_utf8_lossy(&bytes[..valid_len]));
                match e.error_len() {
                    Some(invalid_len) => {
                        text.push(char::REPLACEMENT_CHARACTER);
                        bytes.drain(..valid_len + invalid_len);
                    }
                    None => {
                        bytes.drain(..valid_len);
                        return;
                    }
                }
            }
        }
    }
}

/// Parse one SSE line; non-data lines and end-of-stream markers yield `None`.
fn parse_sse_line(line: &str) -> Option<Result<StreamDelta>> {
    let data = line.strip_prefix("data:")?.trim_start();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }

    match serde_json::from_str::<GenerateContentResponse>(data) {
        Ok(chunk) => Some(Ok(StreamDelta {
            text: chunk.text(),
            finish_reason: chunk.finish_reason(),
        })),
        Err(e) => Some(Err(TutorError::SerializationError(format!(
            "failed to parse stream chunk: {}",
            e
        )))),
    }
}
