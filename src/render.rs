//! Terminal rendering of a [`ContextDetail`].
//!
//! Sections appear in a fixed order, each headed by its token estimate.
//! Sections for absent optional fields are skipped:
//!
//! | Section | Shown when |
//! |---------|------------|
//! | Final Generated Response | always |
//! | System Prompt | always |
//! | Conversation History | always (`(empty)` for a first turn) |
//! | Tool Definitions | tools were declared |
//! | User Message | always |
//! | Tool Call | a real or simulated tool call exists |
//! | Retrieval Process | the document scenario ran retrieval |
//! | Tool Execution Result | a tool result or search grounding exists |

use std::fmt::Write;

use context_lens_core::models::{ContextDetail, Role, ScoredChunk};
use serde_json::Value;

const RULE: &str = "────────────────────────────────────────";

/// Render every populated section followed by the total estimate.
pub fn render_context(ctx: &ContextDetail) -> String {
    let mut out = String::new();

    section(&mut out, "Final Generated Response", Some(ctx.response_token_count));
    line(&mut out, &ctx.response_text);

    section(&mut out, "System Prompt", Some(ctx.system_prompt_token_count));
    line(&mut out, &ctx.system_prompt);

    section(&mut out, "Conversation History", Some(ctx.history_token_count));
    if ctx.history.is_empty() {
        line(&mut out, "(empty)");
    }
    for message in &ctx.history {
        let who = match message.role {
            Role::User => "user",
            Role::Model => "model",
        };
        line(&mut out, &format!("[{}] {}", who, message.text));
    }

    if let Some(defs) = &ctx.tool_definitions {
        section(&mut out, "Tool Definitions", ctx.tool_definitions_token_count);
        line(&mut out, &pretty(defs));
    }

    section(&mut out, "User Message", Some(ctx.user_message_token_count));
    line(&mut out, &ctx.user_message);

    if let Some(call) = &ctx.tool_call {
        let title = if ctx.tool_call_simulated {
            "Tool Call (simulated)"
        } else {
            "Tool Call"
        };
        section(&mut out, title, ctx.tool_call_token_count);
        line(&mut out, &pretty(call));
    }

    if let Some(chunks) = &ctx.retrieved_chunks {
        section(&mut out, "Retrieval Process", ctx.tool_result_token_count);
        if chunks.is_empty() {
            line(&mut out, "No relevant document chunks found.");
        }
        for (i, chunk) in chunks.iter().enumerate() {
            out.push_str(&render_chunk(i + 1, chunk));
        }
    }

    if let Some(result) = &ctx.tool_result {
        section(&mut out, "Tool Execution Result", ctx.tool_result_token_count);
        line(&mut out, &pretty(result));
    } else if let Some(grounding) = &ctx.search_grounding {
        section(&mut out, "Tool Execution Result", ctx.tool_result_token_count);
        if grounding.is_empty() {
            line(&mut out, "(no sources returned)");
        }
        for (i, source) in grounding.iter().enumerate() {
            let _ = writeln!(out, "[{}] {}", i + 1, source.web.title);
            let _ = writeln!(out, "    {}", source.web.uri);
            if let Some(snippet) = &source.snippet {
                let _ = writeln!(out, "    {}", snippet);
            }
        }
    }

    let _ = writeln!(out, "\n{}", RULE);
    let _ = writeln!(out, "Total estimated tokens: {}", ctx.total_tokens());
    let _ = writeln!(
        out,
        "Token counts are approximate (≈4 characters per token)."
    );
    out
}

/// One ranked chunk with its score breakdown.
pub fn render_chunk(rank: usize, chunk: &ScoredChunk) -> String {
    format!(
        "[{}] {}  Score: {} (K: {}, S: {})\n    {}\n",
        rank,
        chunk.chunk.source_title,
        chunk.score.total,
        chunk.score.keyword,
        chunk.score.semantic,
        chunk.chunk.text
    )
}

fn section(out: &mut String, title: &str, tokens: Option<usize>) {
    let _ = writeln!(out, "\n{}", RULE);
    match tokens {
        Some(n) => {
            let _ = writeln!(out, "{} ({} tokens)", title, n);
        }
        None => {
            let _ = writeln!(out, "{}", title);
        }
    }
    let _ = writeln!(out, "{}", RULE);
}

fn line(out: &mut String, text: &str) {
    out.push_str(text);
    out.push('\n');
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
