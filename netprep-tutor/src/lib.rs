//! # NetPrep Tutor (netprep-tutor)
//!
//! The AI tutor engine behind the NetPrep CCNA study app: turns a networking
//! concept into a structured study card by prompting a generative-language
//! model and normalizing whatever comes back.
//!
//! ## Features
//!
//! - Async-first design using tokio and reqwest
//! - Truncated responses stitched back together with bounded continuation calls
//! - A total normalizer: any model output becomes a complete six-field card
//! - Buffered and SSE streaming generation
//! - TTL + LRU response cache behind a pluggable trait
//! - Distinct timeout, upstream-failure, and configuration errors
//!
//! ## Explaining a concept
//!
//! ```no_run
//! use netprep_tutor::{TutorPipeline, TutorRequest};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pipeline = TutorPipeline::from_env()?;
//!
//!     let request = TutorRequest::new("OSPF areas")
//!         .with_context("Chapter 19: OSPF divides a network into areas...");
//!     let explanation = pipeline.explain(&request).await?;
//!
//!     println!("{}", explanation.card.title);
//!     println!("{}", explanation.card.simple_explanation);
//!     for command in &explanation.card.key_commands {
//!         println!("  {}", command);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Streaming
//!
//! ```no_run
//! use futures::StreamExt;
//! use netprep_tutor::{TutorPipeline, TutorRequest, TutorStreamEvent};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pipeline = TutorPipeline::from_env()?;
//!
//!     let mut events = pipeline
//!         .explain_stream(&TutorRequest::new("spanning tree"))
//!         .await?;
//!
//!     while let Some(event) = events.next().await {
//!         match event? {
//!             TutorStreamEvent::Delta(text) => print!("{}", text),
//!             TutorStreamEvent::Card(card) => println!("\n\n=> {}", card.title),
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Normalizing raw output directly
//!
//! The normalizer is a pure function and can be used standalone:
//!
//! ```
//! use netprep_tutor::normalize;
//!
//! let card = normalize("### Simple explanation:\nOSPF is a link-state routing protocol.");
//! assert_eq!(card.simple_explanation, "OSPF is a link-state routing protocol.");
//! ```

pub mod cache;
pub mod card;
pub mod client;
pub mod config;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod types;

// Re-export main types for convenience
pub use cache::{CacheEntry, CacheKey, CacheStats, CacheValue, MemoryCache, NoopCache, ResponseCache};
pub use card::TutorCard;
pub use client::{DeltaStream, GeminiClient, GenerationOutcome, StreamDelta};
pub use config::TutorConfig;
pub use error::{Result, TutorError};
pub use normalize::normalize;
pub use pipeline::{
    Explanation, TutorEventStream, TutorPipeline, TutorRequest, TutorStreamEvent,
};
pub use types::{FinishReason, GenerationConfig};
