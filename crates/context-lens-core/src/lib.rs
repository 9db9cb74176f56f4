//! # Context Lens Core
//!
//! Shared, WASM-safe logic for Context Lens: data models, token
//! estimation, query reduction, sentence chunking, hybrid scoring,
//! retrieval, the `code_interpreter` evaluator, and the per-scenario
//! context assembler.
//!
//! This crate contains no tokio, HTTP client, or filesystem I/O. The
//! hosted model is reached through the [`model::ModelClient`] trait; the
//! application crate supplies the real HTTP implementation and tests use
//! [`model::scripted::ScriptedModel`].

pub mod assembler;
pub mod catalog;
pub mod chunk;
pub mod conversation;
pub mod error;
pub mod expr;
pub mod model;
pub mod models;
pub mod query;
pub mod retrieval;
pub mod scoring;
pub mod snippet;
pub mod tokens;

pub use error::{LensError, Result};
