//! Tree-walking evaluator for the condition expression language.

use super::ast::{CompareOp, Expr, Literal};
use wave_model::{EngineError, Result, Value};

/// Parses and evaluates `source` against `ctx` (typically a `Value::Map` with `input` and
/// `output` keys — see [`crate::condition::evaluate_condition`]), returning the boolean used to
/// gate an edge.
pub fn evaluate(expr: &Expr, ctx: &Value) -> Result<Value> {
    match expr {
        Expr::Literal(Literal::String(s)) => Ok(Value::String(s.clone())),
        Expr::Literal(Literal::Number(n)) => {
            if n.fract() == 0.0 {
                Ok(Value::Int(*n as i64))
            } else {
                Ok(Value::Float(*n))
            }
        }
        Expr::Literal(Literal::Bool(b)) => Ok(Value::Bool(*b)),
        Expr::Literal(Literal::Null) => Ok(Value::Null),
        Expr::Field(segments) => {
            let path = segments.join(".");
            Ok(ctx.get_path(&path).cloned().unwrap_or(Value::Null))
        }
        Expr::Not(inner) => Ok(Value::Bool(!truthy(&evaluate(inner, ctx)?))),
        Expr::And(l, r) => {
            let lv = evaluate(l, ctx)?;
            if !truthy(&lv) {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(truthy(&evaluate(r, ctx)?)))
        }
        Expr::Or(l, r) => {
            let lv = evaluate(l, ctx)?;
            if truthy(&lv) {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(truthy(&evaluate(r, ctx)?)))
        }
        Expr::Compare(op, l, r) => {
            let lv = evaluate(l, ctx)?;
            let rv = evaluate(r, ctx)?;
            Ok(Value::Bool(compare(*op, &lv, &rv)?))
        }
        Expr::Coalesce(l, r) => {
            let lv = evaluate(l, ctx)?;
            if lv.is_null() {
                evaluate(r, ctx)
            } else {
                Ok(lv)
            }
        }
        Expr::TryCatch(body, fallback) => match evaluate(body, ctx) {
            Ok(v) => Ok(v),
            Err(_) => evaluate(fallback, ctx),
        },
        Expr::Call(name, args) => evaluate_call(name, args, ctx),
    }
}

/// Truthiness used by `&&`/`||`/`!` and the final boolean gate: `null` and `false` are falsy,
/// every other value (including empty string/zero, unlike JavaScript) is truthy. The condition
/// language has no implicit numeric/string coercion, so only the two explicit falsy values
/// count.
fn truthy(v: &Value) -> bool {
    !matches!(v, Value::Null | Value::Bool(false))
}

fn compare(op: CompareOp, lv: &Value, rv: &Value) -> Result<bool> {
    use CompareOp::*;
    if matches!(op, Eq | Ne) {
        let eq = values_equal(lv, rv);
        return Ok(if op == Eq { eq } else { !eq });
    }
    let (l, r) = match (lv.as_f64(), rv.as_f64()) {
        (Some(l), Some(r)) => (l, r),
        _ => match (lv, rv) {
            (Value::String(l), Value::String(r)) => {
                let ord = l.cmp(r);
                return Ok(match op {
                    Lt => ord.is_lt(),
                    Le => ord.is_le(),
                    Gt => ord.is_gt(),
                    Ge => ord.is_ge(),
                    Eq | Ne => unreachable!(),
                });
            }
            _ => {
                return Err(EngineError::condition_evaluation(format!(
                    "cannot compare {lv:?} and {rv:?} with {op:?}"
                )))
            }
        },
    };
    Ok(match op {
        Lt => l < r,
        Le => l <= r,
        Gt => l > r,
        Ge => l >= r,
        Eq | Ne => unreachable!(),
    })
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => a.as_f64() == b.as_f64(),
        _ => a == b,
    }
}

fn evaluate_call(name: &str, args: &[Expr], ctx: &Value) -> Result<Value> {
    match name {
        "len" => {
            let arg = require_arg(name, args, 0)?;
            let v = evaluate(arg, ctx)?;
            let len = match &v {
                Value::String(s) => s.chars().count(),
                Value::Seq(items) => items.len(),
                Value::Map(m) => m.len(),
                _ => {
                    return Err(EngineError::condition_evaluation(format!(
                        "len() requires a string, sequence, or map, got {v:?}"
                    )))
                }
            };
            Ok(Value::Int(len as i64))
        }
        "split" => {
            let subject = evaluate(require_arg(name, args, 0)?, ctx)?;
            let sep = evaluate(require_arg(name, args, 1)?, ctx)?;
            let (s, sep) = match (subject.as_str(), sep.as_str()) {
                (Some(s), Some(sep)) => (s, sep),
                _ => return Err(EngineError::condition_evaluation("split() requires two strings")),
            };
            let parts = if sep.is_empty() {
                s.chars().map(|c| Value::String(c.to_string())).collect()
            } else {
                s.split(sep).map(|p| Value::String(p.to_string())).collect()
            };
            Ok(Value::Seq(parts))
        }
        "fromjson" => {
            let v = evaluate(require_arg(name, args, 0)?, ctx)?;
            let s = v
                .as_str()
                .ok_or_else(|| EngineError::condition_evaluation("fromjson() requires a string argument"))?;
            let parsed: serde_json::Value = serde_json::from_str(s)
                .map_err(|e| EngineError::condition_evaluation(format!("fromjson() parse error: {e}")))?;
            Ok(Value::from_json(parsed))
        }
        "filter" => {
            // filter(seq, field, op, literal) — the smallest shape that needs no lambda syntax.
            if args.len() != 4 {
                return Err(EngineError::condition_evaluation(
                    "filter() requires exactly 4 arguments: seq, field, op, literal",
                ));
            }
            let seq = evaluate(&args[0], ctx)?;
            let items = match seq {
                Value::Seq(items) => items,
                other => return Err(EngineError::condition_evaluation(format!("filter() requires a sequence, got {other:?}"))),
            };
            let field = evaluate(&args[1], ctx)?;
            let field = field
                .as_str()
                .ok_or_else(|| EngineError::condition_evaluation("filter()'s field argument must be a string"))?;
            let op_str = evaluate(&args[2], ctx)?;
            let op = parse_compare_op(op_str.as_str().unwrap_or_default())?;
            let literal = evaluate(&args[3], ctx)?;
            let mut kept = Vec::new();
            for item in items {
                let field_value = item.get_path(field).cloned().unwrap_or(Value::Null);
                if compare(op, &field_value, &literal).unwrap_or(false) {
                    kept.push(item);
                }
            }
            Ok(Value::Seq(kept))
        }
        other => Err(EngineError::condition_evaluation(format!("unknown function '{other}'"))),
    }
}

fn require_arg<'a>(fn_name: &str, args: &'a [Expr], idx: usize) -> Result<&'a Expr> {
    args.get(idx)
        .ok_or_else(|| EngineError::condition_evaluation(format!("{fn_name}() missing argument {idx}")))
}

fn parse_compare_op(s: &str) -> Result<CompareOp> {
    match s {
        "==" => Ok(CompareOp::Eq),
        "!=" => Ok(CompareOp::Ne),
        "<" => Ok(CompareOp::Lt),
        "<=" => Ok(CompareOp::Le),
        ">" => Ok(CompareOp::Gt),
        ">=" => Ok(CompareOp::Ge),
        other => Err(EngineError::condition_evaluation(format!("unknown comparison operator '{other}'"))),
    }
}

/// Coerces the final expression result to a bool for edge gating: the edge fires when the
/// condition evaluates true against the predecessor's output.
pub fn evaluate_bool(expr: &Expr, ctx: &Value) -> Result<bool> {
    Ok(truthy(&evaluate(expr, ctx)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::parser::parse;
    use std::collections::BTreeMap;

    fn ctx_with_input(fields: &[(&str, Value)]) -> Value {
        let input = Value::Map(fields.iter().map(|(k, v)| (k.to_string(), v.clone())).collect());
        Value::Map(BTreeMap::from([("input".to_string(), input)]))
    }

    #[test]
    fn score_gate_true() {
        let ctx = ctx_with_input(&[("score", Value::Int(90))]);
        let expr = parse("input.score >= 80").unwrap();
        assert!(evaluate_bool(&expr, &ctx).unwrap());
    }

    #[test]
    fn score_gate_false() {
        let ctx = ctx_with_input(&[("score", Value::Int(60))]);
        let expr = parse("input.score >= 80").unwrap();
        assert!(!evaluate_bool(&expr, &ctx).unwrap());
    }

    #[test]
    fn missing_field_is_null_not_error() {
        let ctx = ctx_with_input(&[]);
        let expr = parse("input.missing ?? 5").unwrap();
        assert_eq!(evaluate(&expr, &ctx).unwrap(), Value::Int(5));
    }

    #[test]
    fn try_catch_recovers_from_errors() {
        let ctx = ctx_with_input(&[("raw", Value::String("not json".into()))]);
        let expr = parse("try fromjson(input.raw) catch null").unwrap();
        assert_eq!(evaluate(&expr, &ctx).unwrap(), Value::Null);
    }

    #[test]
    fn len_and_split_builtins() {
        let ctx = ctx_with_input(&[("s", Value::String("a,b,c".into()))]);
        let split_expr = parse("split(input.s, \",\")").unwrap();
        let result = evaluate(&split_expr, &ctx).unwrap();
        assert_eq!(result, Value::Seq(vec!["a".into(), "b".into(), "c".into()]));
        let len_expr = parse("len(input.s)").unwrap();
        assert_eq!(evaluate(&len_expr, &ctx).unwrap(), Value::Int(5));
    }
}
