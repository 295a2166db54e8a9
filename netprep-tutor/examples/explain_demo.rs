//! Tutor Pipeline Demo Application
//!
//! Generates a study card for a networking concept end to end: prompt,
//! continuation stitching, normalization, and caching.
//!
//! Usage:
//!   cargo run --example explain_demo [concept]
//!
//! Environment variables:
//!   GEMINI_API_KEY - generative-language API key (required)
//!   NETPREP_MODEL  - model identifier (default: gemini-1.5-flash)

use netprep_tutor::{TutorPipeline, TutorRequest};
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("=== NetPrep Tutor Demo ===");

    let concept = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "OSPF areas".to_string());

    let pipeline = TutorPipeline::from_env()?;
    info!(
        "Explaining '{}' with model {}",
        concept,
        pipeline.config().model
    );

    let request = TutorRequest::new(&concept);

    info!("\n--- First Call (generated) ---");
    let explanation = pipeline.explain(&request).await?;
    print_card(&explanation.card);
    info!("cached: {}", explanation.cached);

    info!("\n--- Second Call (served from cache) ---");
    let cached = pipeline.explain(&request).await?;
    info!("cached: {}", cached.cached);

    info!("\n--- Card as JSON ---");
    let json = serde_json::to_string_pretty(&explanation.card)?;
    info!("{}", json);

    info!("\n=== Demo Complete ===");

    Ok(())
}

fn print_card(card: &netprep_tutor::TutorCard) {
    info!("Title: {}", card.title);
    info!("Explanation: {}", card.simple_explanation);
    info!("Example: {}", card.real_world_example);
    for command in &card.key_commands {
        info!("  $ {}", command);
    }
    for mistake in &card.common_mistakes {
        info!("  ! {}", mistake);
    }
    for question in &card.quick_check {
        info!("  ? {}", question);
    }
}
