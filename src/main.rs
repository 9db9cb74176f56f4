//! # Context Lens CLI (`lens`)
//!
//! The `lens` binary runs the four demo scenarios against a hosted model and
//! shows exactly what context each reply was produced from.
//!
//! ## Usage
//!
//! ```bash
//! lens [--config ./config/lens.toml] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `lens scenarios` | List scenarios with descriptions and suggested prompts |
//! | `lens documents` | List the document catalog |
//! | `lens retrieve "<question>"` | Run document retrieval offline and show ranked chunks |
//! | `lens ask --scenario <id> "<message>"` | One turn; prints the reply and its context |
//! | `lens chat --scenario <id>` | Interactive chat over stdin |
//! | `lens serve` | Start the JSON HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! # See which chunks the document scenario would inject
//! lens retrieve "What is the budget for Project Nova?"
//!
//! # Ask with function calling and show the full context
//! GEMINI_API_KEY=... lens ask --scenario data "What is 15% of 240?"
//!
//! # Machine-readable output
//! lens ask --scenario search "Who won the last Super Bowl?" --json
//! ```
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `info`).

use clap::{Parser, Subcommand};
use context_lens::{commands, config, server};
use context_lens_core::models::Scenario;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Context Lens: see exactly what a hosted LLM is given.
#[derive(Parser)]
#[command(
    name = "lens",
    about = "Context Lens: inspect the context sent to a hosted LLM",
    version,
    long_about = "Context Lens runs four demo scenarios (plain chat, function calling, \
    web search grounding, and document retrieval) against a hosted model and breaks every \
    reply down into system prompt, history, tools, retrieved excerpts, and token estimates."
)]
struct Cli {
    /// Path to configuration file (TOML). Built-in defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List scenarios, their descriptions, and suggested prompts.
    Scenarios,

    /// List the document catalog.
    Documents,

    /// Run the document scenario's retrieval step without calling a model.
    ///
    /// Reduces the question to a query, chunks the catalog into sentences,
    /// scores every chunk, and prints the top results.
    Retrieve {
        /// The question to retrieve for.
        query: String,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Send one message and print the reply with its full context.
    Ask {
        /// Scenario id: `normal`, `data`, `search`, or `document`.
        #[arg(long, short)]
        scenario: Scenario,

        /// The user message.
        message: String,

        /// Print `{text, context}` JSON instead of the rendered context.
        #[arg(long)]
        json: bool,
    },

    /// Chat interactively in one scenario.
    ///
    /// Reads one message per line from stdin. `/context` shows the last
    /// context, `/new` starts over, `/history` lists turns, `/quit` exits.
    Chat {
        /// Scenario id: `normal`, `data`, `search`, or `document`.
        #[arg(long, short)]
        scenario: Scenario,
    },

    /// Start the JSON HTTP server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Scenarios => commands::run_scenarios()?,
        Commands::Documents => commands::run_documents(&cfg)?,
        Commands::Retrieve { query, json } => commands::run_retrieve(&cfg, &query, json)?,
        Commands::Ask {
            scenario,
            message,
            json,
        } => commands::run_ask(&cfg, scenario, &message, json).await?,
        Commands::Chat { scenario } => commands::run_chat(&cfg, scenario).await?,
        Commands::Serve => server::run_server(&cfg).await?,
    }

    Ok(())
}
