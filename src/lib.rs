//! # Context Lens
//!
//! Make the context behind a hosted LLM reply visible.
//!
//! For every turn Context Lens assembles what the model is given (system
//! prompt, conversation history, tool declarations, retrieved excerpts, tool
//! results) and attaches a per-field token estimate to the reply. Four demo
//! scenarios show how context grows: plain chat, function calling against a
//! calculator tool, hosted web search, and retrieval-augmented answers over
//! a small document catalog.
//!
//! ## Architecture
//!
//! ```text
//!                ┌──────────────────────────────┐
//!                │      context-lens-core       │
//!  message ─────▶│ reduce → chunk → score → rank│
//!                │   scenario assembler         │──▶ reply + ContextDetail
//!                └──────────────┬───────────────┘
//!                               │ ModelClient
//!                               ▼
//!                        ┌─────────────┐
//!                        │ GeminiClient│
//!                        └─────────────┘
//!            ┌──────────┐              ┌──────────┐
//!            │   CLI    │              │   HTTP   │
//!            │  (lens)  │              │  server  │
//!            └──────────┘              └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and catalog loading |
//! | [`gemini`] | Gemini REST model client |
//! | [`render`] | Terminal rendering of a context record |
//! | [`commands`] | CLI command implementations |
//! | [`server`] | JSON HTTP server |
//!
//! The scenario logic itself lives in [`context_lens_core`].

pub mod commands;
pub mod config;
pub mod gemini;
pub mod render;
pub mod server;
