//! Normalizer Demo Application
//!
//! Runs the response normalizer against the kinds of output a generative
//! model actually produces: clean JSON, fenced JSON, JSON buried in prose,
//! markdown headings, and plain text. No API key required.
//!
//! Usage:
//!   cargo run --example normalize_demo

use netprep_tutor::normalize;
use tracing::{info, Level};

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("=== Normalizer Demo ===");

    let samples: &[(&str, &str)] = &[
        (
            "clean JSON",
            r#"{"title": "VLANs", "simpleExplanation": "A VLAN splits one switch into several broadcast domains.", "keyCommands": ["vlan 10", "switchport access vlan 10"]}"#,
        ),
        (
            "fenced JSON",
            "```json\n{\"title\": \"NAT\", \"simpleExplanation\": \"NAT rewrites private addresses to a public one at the network edge.\"}\n```",
        ),
        (
            "JSON buried in prose",
            "Sure! Here is the card you asked for: {\"title\": \"DHCP\", \"simpleExplanation\": \"DHCP hands out IP addresses automatically so hosts do not need manual configuration.\", \"quickCheck\": [\"Which message starts the exchange?\"]} Hope this helps!",
        ),
        (
            "markdown headings",
            "### Simple explanation:\nSpanning tree blocks redundant links so frames cannot loop forever.\n### Common mistakes:\n- Forgetting that blocked ports still listen\n### Quick check:\n- What is the default STP priority?",
        ),
        (
            "plain text",
            "Port security limits which MAC addresses may use a switch port.",
        ),
    ];

    for (label, raw) in samples {
        info!("\n--- {} ---", label);
        let card = normalize(raw);
        info!("title: {:?}", card.title);
        info!("explanation: {:?}", card.simple_explanation);
        if !card.key_commands.is_empty() {
            info!("commands: {:?}", card.key_commands);
        }
        if !card.common_mistakes.is_empty() {
            info!("mistakes: {:?}", card.common_mistakes);
        }
        if !card.quick_check.is_empty() {
            info!("quick check: {:?}", card.quick_check);
        }
    }

    info!("\n=== Demo Complete ===");
}
