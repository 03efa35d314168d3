//! The restricted condition expression language used to gate edges.

mod ast;
mod eval;
mod lexer;
mod parser;

pub use ast::{CompareOp, Expr, Literal};
pub use eval::{evaluate, evaluate_bool};
pub use parser::parse;

use std::collections::BTreeMap;
use wave_model::{Result, Value};

/// Parses `source` and evaluates it against a predecessor's `input`/`output`, returning
/// whether the gated edge fires. This is what the static validator calls (parse-only, to
/// check the expression is well-formed) and what the scheduler calls (parse + evaluate).
pub fn evaluate_condition(source: &str, input: &Value, output: &Value) -> Result<bool> {
    let expr = parse(source).map_err(wave_model::EngineError::condition_evaluation)?;
    let ctx = Value::Map(BTreeMap::from([
        ("input".to_string(), input.clone()),
        ("output".to_string(), output.clone()),
    ]));
    evaluate_bool(&expr, &ctx)
}

/// Parses `source` without evaluating it — used by the static validator to reject malformed
/// condition expressions before execution starts.
pub fn validate_syntax(source: &str) -> std::result::Result<(), String> {
    parse(source).map(|_| ())
}
