//! Tutor pipeline: prompt assembly, continuation, normalization, caching
//!
//! `TutorPipeline` is the single entry point the CLI and the API server call.
//! It owns the upstream client and an injected [`ResponseCache`], builds the
//! instruction prompt, stitches truncated responses back together, and always
//! hands back a complete [`TutorCard`] regardless of what the model produced.

use crate::cache::{MemoryCache, ResponseCache};
use crate::card::TutorCard;
use crate::client::{DeltaStream, GeminiClient};
use crate::config::TutorConfig;
use crate::error::{Result, TutorError};
use crate::normalize::normalize;
use crate::types::GenerationConfig;
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Characters from the end of the accumulated text echoed back to the model
/// when requesting a continuation.
const CONTINUATION_TAIL_CHARS: usize = 2_000;

/// One study question to explain
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TutorRequest {
    /// Concept label, e.g. "OSPF areas". Must be non-empty.
    pub concept: String,

    /// Optional study material giving the model extra context. Truncated to
    /// the configured bound before it enters the prompt.
    pub context: Option<String>,

    /// Skip cache lookup and storage for this request.
    pub skip_cache: bool,
}

impl TutorRequest {
    pub fn new(concept: impl Into<String>) -> Self {
        Self {
            concept: concept.into(),
            ..Default::default()
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// A delivered explanation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Explanation {
    /// The normalized card. Always complete (every field present).
    pub card: TutorCard,

    /// True when served from the response cache.
    pub cached: bool,
}

/// Events produced by the streaming path
#[derive(Debug, Clone)]
pub enum TutorStreamEvent {
    /// A raw text fragment, forwarded as the model produces it
    Delta(String),

    /// The final normalized card, emitted once the stream completes
    Card(TutorCard),
}

/// Boxed stream of tutor events
pub type TutorEventStream = Pin<Box<dyn Stream<Item = Result<TutorStreamEvent>> + Send>>;

/// Orchestrates one explanation end to end
pub struct TutorPipeline {
    config: TutorConfig,
    client: GeminiClient,
    cache: Arc<dyn ResponseCache>,
}

impl TutorPipeline {
    /// Build a pipeline with the default in-memory cache.
    pub fn new(config: TutorConfig) -> Result<Self> {
        let cache = Arc::new(MemoryCache::new(config.cache_ttl, config.cache_max_entries));
        Self::with_cache(config, cache)
    }

    /// Build a pipeline with an injected cache implementation.
    pub fn with_cache(config: TutorConfig, cache: Arc<dyn ResponseCache>) -> Result<Self> {
        let client = GeminiClient::new(&config)?;
        Ok(Self {
            config,
            client,
            cache,
        })
    }

    /// Build a pipeline from environment configuration.
    pub fn from_env() -> Result<Self> {
        Self::new(TutorConfig::from_env()?)
    }

    pub fn config(&self) -> &TutorConfig {
        &self.config
    }

    /// Produce a complete tutor card for one concept.
    ///
    /// Consults the cache first, then calls the model (stitching truncated
    /// responses back together) and normalizes whatever comes back. Upstream
    /// failures surface as errors; malformed output never does.
    pub async fn explain(&self, request: &TutorRequest) -> Result<Explanation> {
        let concept = request.concept.trim();
        if concept.is_empty() {
            return Err(TutorError::InvalidRequest(
                "concept must not be empty".to_string(),
            ));
        }

        let prompt = self.build_prompt(concept, request.context.as_deref());
        let key = self.cache_key(&prompt);

        if !request.skip_cache {
            if let Some(hit) = self.cache.get(&key).await {
                match serde_json::from_str::<TutorCard>(&hit) {
                    Ok(card) => {
                        info!("Serving cached explanation for '{}'", concept);
                        return Ok(Explanation { card, cached: true });
                    }
                    Err(e) => warn!("Discarding undecodable cache entry: {}", e),
                }
            }
        }

        info!("Generating explanation for '{}'", concept);
        let text = self.generate_complete(&prompt).await?;

        let mut card = normalize(&text);
        if card.title.is_empty() {
            card.title = concept.to_string();
        }

        if !request.skip_cache {
            match serde_json::to_string(&card) {
                Ok(serialized) => self.cache.set(key, serialized).await,
                Err(e) => warn!("Failed to serialize card for caching: {}", e),
            }
        }

        Ok(Explanation {
            card,
            cached: false,
        })
    }

    /// Produce an explanation as a stream of text deltas followed by the
    /// final normalized card.
    ///
    /// A cache hit yields a single [`TutorStreamEvent::Card`]. Mid-stream
    /// failures arrive as an `Err` item and end the stream; the caller keeps
    /// whatever deltas it has already rendered. The streaming path does not
    /// stitch continuations (a truncated stream normalizes as-is).
    pub async fn explain_stream(&self, request: &TutorRequest) -> Result<TutorEventStream> {
        let concept = request.concept.trim().to_string();
        if concept.is_empty() {
            return Err(TutorError::InvalidRequest(
                "concept must not be empty".to_string(),
            ));
        }

        let prompt = self.build_prompt(&concept, request.context.as_deref());
        let key = self.cache_key(&prompt);

        if !request.skip_cache {
            if let Some(hit) = self.cache.get(&key).await {
                if let Ok(card) = serde_json::from_str::<TutorCard>(&hit) {
                    info!("Serving cached explanation for '{}' (stream)", concept);
                    let event = TutorStreamEvent::Card(card);
                    return Ok(Box::pin(stream::once(async move { Ok(event) })));
                }
            }
        }

        info!("Streaming explanation for '{}'", concept);
        let deltas = self
            .client
            .stream_generate(&prompt, self.generation_config())
            .await?;

        let cache = (!request.skip_cache).then(|| Arc::clone(&self.cache));
        Ok(forward_and_normalize(deltas, concept, cache, key))
    }

    /// Run the buffered call plus the truncation-continuation loop.
    ///
    /// Continuations are strictly sequential: each prompt carries the tail of
    /// the text accumulated so far. A failed or empty continuation keeps the
    /// partial text rather than surfacing an error.
    async fn generate_complete(&self, prompt: &str) -> Result<String> {
        let generation = self.generation_config();

        let first = self.client.generate(prompt, generation).await?;
        let mut truncated = first.is_truncated();
        let mut text = first.text;
        let mut rounds = 0;

        while truncated
            && rounds < self.config.max_continuations
            && text.chars().count() < self.config.max_total_chars
        {
            rounds += 1;
            debug!(
                "Response truncated, requesting continuation {}/{}",
                rounds, self.config.max_continuations
            );

            let continuation_prompt = build_continuation_prompt(prompt, &text);
            let outcome = match self
                .client
                .generate(&continuation_prompt, generation)
                .await
            {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("Continuation request failed, keeping partial text: {}", e);
                    break;
                }
            };

            if !append_continuation(&mut text, &outcome.text) {
                debug!("Empty continuation, stopping");
                break;
            }

            truncated = outcome.is_truncated();
        }

        if truncated {
            warn!(
                "Response still truncated after {} continuation round(s)",
                rounds
            );
        }

        Ok(text)
    }

    /// Build the instruction prompt for one concept.
    fn build_prompt(&self, concept: &str, context: Option<&str>) -> String {
        let context_block = context
            .map(|c| truncate_chars(c.trim(), self.config.max_context_chars))
            .filter(|c| !c.is_empty())
            .map(|c| format!("\nStudy material for extra context:\n{}\n", c))
            .unwrap_or_default();

        format!(
            r#"You are a CCNA tutor helping a student prepare for the exam.

Explain this networking concept: {concept}
{context_block}
Respond with a single JSON object, using exactly this shape:
{{
  "title": "short display title",
  "simpleExplanation": "two to four sentences a beginner can follow",
  "realWorldExample": "one concrete scenario from a real network",
  "keyCommands": ["relevant IOS commands, empty array if none apply"],
  "commonMistakes": ["typical exam or lab mistakes"],
  "quickCheck": ["one or two self-test questions"]
}}

Output ONLY the JSON object, no other text."#
        )
    }

    fn cache_key(&self, prompt: &str) -> String {
        format!("{}:{}", self.client.model(), prompt)
    }

    fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            max_output_tokens: self.config.max_output_tokens,
            temperature: self.config.temperature,
        }
    }
}

impl std::fmt::Debug for TutorPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TutorPipeline")
            .field("client", &self.client)
            .finish()
    }
}

/// Forward deltas to the caller while accumulating a transcript; once the
/// stream ends, normalize the transcript into the final card and cache it.
fn forward_and_normalize(
    deltas: DeltaStream,
    concept: String,
    cache: Option<Arc<dyn ResponseCache>>,
    key: String,
) -> TutorEventStream {
    struct State {
        deltas: DeltaStream,
        transcript: String,
        concept: String,
        cache: Option<Arc<dyn ResponseCache>>,
        key: String,
        done: bool,
    }

    let state = State {
        deltas,
        transcript: String::new(),
        concept,
        cache,
        key,
        done: false,
    };

    let events = stream::unfold(state, |mut st| async move {
        if st.done {
            return None;
        }

        loop {
            match st.deltas.next().await {
                Some(Ok(delta)) if delta.text.is_empty() => continue,
                Some(Ok(delta)) => {
                    st.transcript.push_str(&delta.text);
                    return Some((Ok(TutorStreamEvent::Delta(delta.text)), st));
                }
                Some(Err(e)) => {
                    st.done = true;
                    return Some((Err(e), st));
                }
                None => {
                    st.done = true;

                    let mut card = normalize(&st.transcript);
                    if card.title.is_empty() {
                        card.title = st.concept.clone();
                    }

                    if let Some(cache) = st.cache.take() {
                        match serde_json::to_string(&card) {
                            Ok(serialized) => {
                                cache.set(std::mem::take(&mut st.key), serialized).await
                            }
                            Err(e) => warn!("Failed to serialize card for caching: {}", e),
                        }
                    }

                    return Some((Ok(TutorStreamEvent::Card(card)), st));
                }
            }
        }
    });

    Box::pin(events)
}

/// Append one continuation chunk per the seam rule: trim the chunk's leading
/// whitespace and insert at most one newline between chunks. Returns false
/// when the chunk was empty after trimming.
fn append_continuation(text: &mut String, chunk: &str) -> bool {
    let chunk = chunk.trim_start();
    if chunk.is_empty() {
        return false;
    }

    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    text.push_str(chunk);
    true
}

/// Build the prompt asking the model to pick up where a truncated response
/// left off.
fn build_continuation_prompt(original_prompt: &str, text_so_far: &str) -> String {
    let tail = tail_chars(text_so_far, CONTINUATION_TAIL_CHARS);

    format!(
        r#"Your previous answer to the request below was cut off before it finished.

Original request:
{original_prompt}

Your answer so far ends with:
...{tail}

Continue exactly where the answer left off. Do not repeat anything already written, do not start over, and do not add any preamble."#
    )
}

/// Last `max_chars` characters of `text`, char-boundary safe.
fn tail_chars(text: &str, max_chars: usize) -> &str {
    let char_count = text.chars().count();
    if char_count <= max_chars {
        return text;
    }

    let skip = char_count - max_chars;
    match text.char_indices().nth(skip) {
        Some((i, _)) => &text[i..],
        None => text,
    }
}

/// First `max_chars` characters of `text`, char-boundary safe.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((i, _)) => &text[..i],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_pipeline() -> TutorPipeline {
        TutorPipeline::new(TutorConfig::new("test-key")).unwrap()
    }

    #[tokio::test]
    async fn test_empty_concept_rejected() {
        let pipeline = test_pipeline();

        let err = pipeline
            .explain(&TutorRequest::new("   "))
            .await
            .unwrap_err();
        assert!(matches!(err, TutorError::InvalidRequest(_)));

        let err = pipeline
            .explain_stream(&TutorRequest::new(""))
            .await
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(err, TutorError::InvalidRequest(_)));
    }

    #[test]
    fn test_prompt_contains_concept_and_shape() {
        let pipeline = test_pipeline();

        let prompt = pipeline.build_prompt("OSPF areas", None);
        assert!(prompt.contains("OSPF areas"));
        assert!(prompt.contains("simpleExplanation"));
        assert!(prompt.contains("quickCheck"));
        assert!(!prompt.contains("Study material"));
    }

    #[test]
    fn test_prompt_context_is_truncated() {
        let pipeline = test_pipeline();
        let long_context = "z".repeat(5_000);

        let prompt = pipeline.build_prompt("VLANs", Some(&long_context));
        assert!(prompt.contains("Study material"));

        // 'z' appears nowhere else in the prompt template
        let embedded = prompt.chars().filter(|c| *c == 'z').count();
        assert_eq!(embedded, pipeline.config.max_context_chars);
    }

    #[test]
    fn test_blank_context_is_omitted() {
        let pipeline = test_pipeline();

        let prompt = pipeline.build_prompt("VLANs", Some("   \n  "));
        assert!(!prompt.contains("Study material"));
    }

    #[test]
    fn test_cache_key_includes_model() {
        let pipeline = test_pipeline();

        let key = pipeline.cache_key("some prompt");
        assert!(key.starts_with("gemini-1.5-flash:"));
        assert!(key.ends_with("some prompt"));
    }

    #[test]
    fn test_append_continuation_seam() {
        let mut text = String::from("first part");
        assert!(append_continuation(&mut text, "  second part"));
        assert_eq!(text, "first part\nsecond part");

        // No doubled newline when one is already there
        let mut text = String::from("first part\n");
        assert!(append_continuation(&mut text, "second part"));
        assert_eq!(text, "first part\nsecond part");

        // Whitespace-only continuations are a stop signal
        let mut text = String::from("first part");
        assert!(!append_continuation(&mut text, "   \n  "));
        assert_eq!(text, "first part");
    }

    #[test]
    fn test_tail_chars_boundaries() {
        assert_eq!(tail_chars("hello", 10), "hello");
        assert_eq!(tail_chars("hello world", 5), "world");

        // Multibyte input must not split a char
        let text = "héllo wörld";
        let tail = tail_chars(text, 4);
        assert_eq!(tail, "örld");
    }

    #[test]
    fn test_truncate_chars_boundaries() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello world", 5), "hello");
        assert_eq!(truncate_chars("héllo", 2), "hé");
    }

    #[test]
    fn test_continuation_prompt_carries_tail() {
        let prompt = build_continuation_prompt("explain OSPF", "the answer so far");
        assert!(prompt.contains("explain OSPF"));
        assert!(prompt.contains("...the answer so far"));
        assert!(prompt.contains("Continue exactly"));
    }

    #[test]
    fn test_request_builders() {
        let request = TutorRequest::new("OSPF").with_context("chapter text");
        assert_eq!(request.concept, "OSPF");
        assert_eq!(request.context.as_deref(), Some("chapter text"));
        assert!(!request.skip_cache);
    }
}
