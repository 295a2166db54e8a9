use anyhow::Result;
use clap::{Parser, Subcommand};
use futures::StreamExt;
use std::io::Write;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use netprep::api::server::{ApiServer, ApiServerConfig};
use netprep_tutor::{TutorCard, TutorConfig, TutorPipeline, TutorRequest, TutorStreamEvent};

#[derive(Parser)]
#[command(name = "netprep")]
#[command(about = "CCNA Flashcard AI Tutor", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Explain a networking concept as a study card
    Explain {
        /// The concept to explain (e.g., "OSPF areas")
        concept: String,

        /// Extra context from the flashcard being studied
        #[arg(short, long)]
        context: Option<String>,

        /// Stream the answer as it is generated
        #[arg(long)]
        stream: bool,

        /// Bypass the response cache for this request
        #[arg(long)]
        no_cache: bool,

        /// Override the configured model
        #[arg(long)]
        model: Option<String>,
    },

    /// Start API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "netprep=info,netprep_tutor=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Explain {
            ref concept,
            ref context,
            stream,
            no_cache,
            ref model,
        } => {
            let mut config = TutorConfig::from_env()?;
            if let Some(model) = model {
                config = config.with_model(model.clone());
            }
            let pipeline = TutorPipeline::new(config)?;

            let mut request = TutorRequest::new(concept.clone());
            if let Some(context) = context {
                request = request.with_context(context.clone());
            }
            request.skip_cache = no_cache;

            if stream {
                let mut events = pipeline.explain_stream(&request).await?;
                while let Some(event) = events.next().await {
                    match event? {
                        TutorStreamEvent::Delta(text) => {
                            print!("{}", text);
                            std::io::stdout().flush()?;
                        }
                        TutorStreamEvent::Card(card) => {
                            println!("\n");
                            print_card(&card);
                        }
                    }
                }
            } else {
                let explanation = pipeline.explain(&request).await?;
                print_card(&explanation.card);
                if explanation.cached {
                    println!("\n(served from cache)");
                }
            }
        }

        Commands::Serve { ref host, port } => {
            let config = ApiServerConfig {
                host: host.clone(),
                port,
            };

            let server = ApiServer::new(config);
            println!("Starting API server on {}:{}", host, port);
            server.start().await?;
        }
    }

    Ok(())
}

fn print_card(card: &TutorCard) {
    println!("{}", card.title);
    println!("{}", "=".repeat(70));

    if !card.simple_explanation.is_empty() {
        println!("\nSimple explanation:");
        println!("{}", card.simple_explanation);
    }

    if !card.real_world_example.is_empty() {
        println!("\nReal-world example:");
        println!("{}", card.real_world_example);
    }

    if !card.key_commands.is_empty() {
        println!("\nKey commands:");
        for command in &card.key_commands {
            println!("  - {}", command);
        }
    }

    if !card.common_mistakes.is_empty() {
        println!("\nCommon mistakes:");
        for mistake in &card.common_mistakes {
            println!("  - {}", mistake);
        }
    }

    if !card.quick_check.is_empty() {
        println!("\nQuick check:");
        for question in &card.quick_check {
            println!("  - {}", question);
        }
    }
}
