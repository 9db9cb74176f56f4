//! Error types for the context assembly pipeline.
//!
//! Tool evaluation failures are not represented here: they are
//! recovered inside the assembler (see [`crate::expr::EvalError`]) and
//! never reach the caller.

use thiserror::Error;

/// Errors surfaced by [`Assembler`](crate::assembler::Assembler) and model clients.
#[derive(Error, Debug)]
pub enum LensError {
    /// A scenario identifier outside `normal`, `data`, `search`, `document`.
    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),

    /// The hosted model call failed (network, quota, malformed payload).
    #[error("Upstream model error: {0}")]
    Upstream(String),

    /// The hosted model call did not complete within the configured timeout.
    #[error("Upstream model call timed out after {0}s")]
    Timeout(u64),

    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A specialized `Result` type for context assembly.
pub type Result<T> = std::result::Result<T, LensError>;
