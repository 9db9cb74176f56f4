//! CLI command implementations.
//!
//! Each `run_*` function backs one `lens` subcommand and prints to stdout.
//! Diagnostics go through `tracing` (stderr) so `--json` output stays clean.

use anyhow::{bail, Result};
use context_lens_core::assembler::Assembler;
use context_lens_core::catalog::scenario_configs;
use context_lens_core::conversation::Conversation;
use context_lens_core::models::{Role, Scenario};
use context_lens_core::query::reduce_query;
use context_lens_core::scoring::HybridScorer;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::{load_documents, Config};
use crate::gemini::create_client;
use crate::render::{render_chunk, render_context};

fn build_assembler(config: &Config) -> Result<Assembler> {
    let documents = load_documents(config)?;
    Ok(Assembler::new(
        documents,
        HybridScorer::default(),
        config.retrieval.top_k,
    ))
}

/// `lens scenarios`
pub fn run_scenarios() -> Result<()> {
    for cfg in scenario_configs() {
        println!("{:<10} {}", cfg.id.as_str(), cfg.title);
        println!("           {}", cfg.description);
        for suggestion in cfg.suggestions {
            println!("           - {}", suggestion);
        }
        println!();
    }
    Ok(())
}

/// `lens documents`
pub fn run_documents(config: &Config) -> Result<()> {
    let documents = load_documents(config)?;
    for (i, doc) in documents.iter().enumerate() {
        println!("[{}] {} ({} chars)", i, doc.title, doc.content.chars().count());
    }
    Ok(())
}

/// `lens retrieve`: the document scenario's retrieval step, offline.
pub fn run_retrieve(config: &Config, message: &str, as_json: bool) -> Result<()> {
    if message.trim().is_empty() {
        bail!("query must not be empty");
    }

    let assembler = build_assembler(config)?;
    let query = reduce_query(message);
    let results = assembler.retrieve(message);

    if as_json {
        let out = json!({ "query": query, "results": results });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("query: {}", query);
    println!("scorer: {}", assembler.scorer().describe());
    if results.is_empty() {
        println!("No relevant document chunks found.");
        return Ok(());
    }
    for (i, chunk) in results.iter().enumerate() {
        print!("{}", render_chunk(i + 1, chunk));
    }
    Ok(())
}

/// `lens ask`: one turn with no prior history.
pub async fn run_ask(config: &Config, scenario: Scenario, message: &str, as_json: bool) -> Result<()> {
    if message.trim().is_empty() {
        bail!("message must not be empty");
    }

    let assembler = build_assembler(config)?;
    let client = create_client(&config.model)?;
    let reply = assembler
        .respond(client.as_ref(), scenario, &[], message)
        .await?;

    if as_json {
        let out = json!({ "text": reply.text, "context": reply.context });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{}", reply.text);
        print!("{}", render_context(&reply.context));
    }
    Ok(())
}

/// `lens chat`: interactive loop over stdin.
///
/// Lines starting with `/` are commands: `/context`, `/new`, `/history`,
/// `/quit`. Every other non-empty line is sent as a turn. A failed turn
/// prints the generic failure reply and the loop continues.
pub async fn run_chat(config: &Config, scenario: Scenario) -> Result<()> {
    let assembler = build_assembler(config)?;
    let client = create_client(&config.model)?;
    let mut conversation = Conversation::new(scenario);

    println!(
        "Chatting in '{}' scenario. Commands: /context /new /history /quit",
        scenario
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => continue,
            "/quit" | "/exit" => break,
            "/context" => match conversation.last_context() {
                Some(ctx) => print!("{}", render_context(ctx)),
                None => println!("No context yet."),
            },
            "/new" => {
                let archived = conversation.reset();
                println!("Started a new chat ({} messages archived).", archived.len());
            }
            "/history" => {
                for message in conversation.recent_first() {
                    let who = match message.role {
                        Role::User => "you",
                        Role::Model => "model",
                    };
                    println!("#{} [{}] {}", message.seq, who, message.text);
                }
            }
            text if text.starts_with('/') => println!("Unknown command: {}", text),
            text => {
                // The failure reply is already recorded in the transcript.
                let reply = match assembler
                    .converse(client.as_ref(), &mut conversation, text)
                    .await
                {
                    Ok(message) => message.text.clone(),
                    Err(e) => {
                        eprintln!("error: {}", e);
                        conversation
                            .messages()
                            .last()
                            .map(|m| m.text.clone())
                            .unwrap_or_default()
                    }
                };
                println!("{}", reply);
            }
        }
    }

    Ok(())
}
