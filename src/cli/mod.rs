//! CLI support for ngexpr
//!
//! Provides programmatic access to the ngexpr commands so other tools can
//! embed them.

mod check;

pub use check::{EvalOptions, execute_check, execute_eval, execute_tokens, execute_watch};

use std::io;

use thiserror::Error;

/// Errors that can occur during CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Parse(#[from] crate::ParseError),

    #[error("Evaluation error: {0}")]
    Eval(#[from] crate::EvalError),

    #[error("{0}")]
    Watch(#[from] crate::WatchError),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
