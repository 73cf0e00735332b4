//! Tokenize, validate, evaluate and bridge expressions from the command line

use std::rc::Rc;

use super::CliError;
use crate::{FilterMap, Parser, Value, WatchParser, lex, output};

/// Options for the eval command
#[derive(Debug, Clone, Default)]
pub struct EvalOptions {
    /// The expression to evaluate
    pub expression: String,
    /// JSON scope; an empty object when absent
    pub input: Option<String>,
    /// Pretty-print the output
    pub pretty: bool,
}

/// One line per token: column, source text and the literal value if any.
pub fn execute_tokens(expression: &str) -> Result<Vec<String>, CliError> {
    let tokens = lex(expression).map_err(crate::ParseError::from)?;
    Ok(tokens
        .iter()
        .map(|token| match &token.value {
            Some(value) => format!(
                "{:>4}  {:<12} {}",
                token.index + 1,
                token.text,
                output::to_json_string(value)
            ),
            None => format!("{:>4}  {}", token.index + 1, token.text),
        })
        .collect())
}

/// Parse only; returns the canonical rendering of the tree.
pub fn execute_check(expression: &str) -> Result<String, CliError> {
    let expr = Parser::new().parse(expression)?;
    Ok(expr.to_string())
}

/// Evaluate against a JSON scope with the builtin filters.
pub fn execute_eval(options: &EvalOptions) -> Result<serde_json::Value, CliError> {
    let scope = match options.input.as_deref() {
        Some(json) if !json.trim().is_empty() => output::from_json(serde_json::from_str(json)?),
        _ => Value::empty_object(),
    };

    let expr = Parser::new().parse(&options.expression)?;
    let result = expr.evaluate(&scope, &FilterMap::builtin())?;
    Ok(output::to_json(&result))
}

/// Bridge the expression and render the resulting watch tree.
pub fn execute_watch(expression: &str, as_collection: bool) -> Result<String, CliError> {
    let bridge = WatchParser::new(Rc::new(Parser::new()));
    let tree = bridge.parse(expression, &FilterMap::builtin(), as_collection, None)?;
    Ok(format!("{tree}\n{tree:#?}"))
}
