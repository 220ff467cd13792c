//! Evaluator for parsed expressions and scripts.
//!
//! Evaluation is pure except for host functions: anything that needs the
//! outside world (notably `include`) is routed through the [`HostFns`]
//! seam, which the processor implements. The evaluator itself never does
//! I/O.

use std::collections::BTreeMap;

use crate::eval::EvalError;
use crate::eval::parser::{BinaryOp, Expr, Stmt, UnaryOp};
use crate::eval::value::Value;

/// Recursion bound for expression evaluation. Pathological nesting fails
/// with [`EvalError::DepthExceeded`] instead of overflowing the stack.
const MAX_DEPTH: usize = 128;

/// A flat evaluation environment: variable name to value.
#[derive(Debug, Clone, Default)]
pub struct Env {
    vars: BTreeMap<String, Value>,
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bindings(vars: BTreeMap<String, Value>) -> Self {
        Self { vars }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.vars.insert(name.to_string(), value);
    }

    /// Consume the environment and return its bindings.
    pub fn into_bindings(self) -> BTreeMap<String, Value> {
        self.vars
    }
}

/// Host-provided functions available to expressions beyond the pure
/// builtins. Unknown names must fail with [`EvalError::UnknownFunction`].
pub trait HostFns {
    fn call(&mut self, name: &str, args: &[Value]) -> Result<Value, EvalError>;
}

/// A host that provides no functions. Used for frontmatter scripts, where
/// `include` is not available.
pub struct NoHostFns;

impl HostFns for NoHostFns {
    fn call(&mut self, name: &str, _args: &[Value]) -> Result<Value, EvalError> {
        Err(EvalError::UnknownFunction(name.to_string()))
    }
}

/// Evaluate an expression against an environment.
pub fn evaluate(expr: &Expr, env: &Env, host: &mut dyn HostFns) -> Result<Value, EvalError> {
    eval_expr(expr, env, host, 0)
}

/// Run a script, mutating the environment with its assignments. Bare
/// expression statements are evaluated for effect and discarded.
pub fn run_script(
    statements: &[Stmt],
    env: &mut Env,
    host: &mut dyn HostFns,
) -> Result<(), EvalError> {
    for statement in statements {
        match statement {
            Stmt::Assign { name, value } => {
                let value = eval_expr(value, env, host, 0)?;
                env.set(name, value);
            }
            Stmt::Expr(expr) => {
                eval_expr(expr, env, host, 0)?;
            }
        }
    }
    Ok(())
}

fn eval_expr(
    expr: &Expr,
    env: &Env,
    host: &mut dyn HostFns,
    depth: usize,
) -> Result<Value, EvalError> {
    if depth > MAX_DEPTH {
        return Err(EvalError::DepthExceeded);
    }

    match expr {
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::Str(s) => Ok(Value::String(s.clone())),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Null => Ok(Value::Null),
        Expr::List(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.push(eval_expr(item, env, host, depth + 1)?);
            }
            Ok(Value::List(values))
        }
        Expr::Var(name) => env
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::UndefinedVariable(name.clone())),
        Expr::Unary { op, operand } => {
            let value = eval_expr(operand, env, host, depth + 1)?;
            match op {
                UnaryOp::Neg => Ok(Value::Number(-as_number(&value)?)),
                UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
            }
        }
        Expr::Binary { op, left, right } => {
            // Short-circuit forms return the deciding operand's value.
            match op {
                BinaryOp::And => {
                    let l = eval_expr(left, env, host, depth + 1)?;
                    if !l.is_truthy() {
                        return Ok(l);
                    }
                    return eval_expr(right, env, host, depth + 1);
                }
                BinaryOp::Or => {
                    let l = eval_expr(left, env, host, depth + 1)?;
                    if l.is_truthy() {
                        return Ok(l);
                    }
                    return eval_expr(right, env, host, depth + 1);
                }
                _ => {}
            }

            let l = eval_expr(left, env, host, depth + 1)?;
            let r = eval_expr(right, env, host, depth + 1)?;
            eval_binary(*op, &l, &r)
        }
        Expr::Ternary {
            cond,
            then,
            otherwise,
        } => {
            let cond = eval_expr(cond, env, host, depth + 1)?;
            if cond.is_truthy() {
                eval_expr(then, env, host, depth + 1)
            } else {
                eval_expr(otherwise, env, host, depth + 1)
            }
        }
        Expr::Call { name, args } => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(eval_expr(arg, env, host, depth + 1)?);
            }
            call_builtin(name, &values)
                .unwrap_or_else(|| host.call(name, &values))
        }
        Expr::Member { object, field } => {
            let object = eval_expr(object, env, host, depth + 1)?;
            match object {
                Value::Object(map) => map.get(field).cloned().ok_or_else(|| {
                    EvalError::Type(format!("object has no field '{}'", field))
                }),
                other => Err(EvalError::Type(format!(
                    "cannot access field '{}' on {}",
                    field,
                    other.type_name()
                ))),
            }
        }
        Expr::Index { object, index } => {
            let object = eval_expr(object, env, host, depth + 1)?;
            let index = eval_expr(index, env, host, depth + 1)?;
            match (&object, &index) {
                (Value::List(items), Value::Number(n)) => {
                    let i = *n as usize;
                    if n.fract() != 0.0 || *n < 0.0 || i >= items.len() {
                        Err(EvalError::Type(format!(
                            "index {} out of bounds for list of {}",
                            index,
                            items.len()
                        )))
                    } else {
                        Ok(items[i].clone())
                    }
                }
                (Value::Object(map), Value::String(key)) => {
                    map.get(key).cloned().ok_or_else(|| {
                        EvalError::Type(format!("object has no field '{}'", key))
                    })
                }
                (object, index) => Err(EvalError::Type(format!(
                    "cannot index {} with {}",
                    object.type_name(),
                    index.type_name()
                ))),
            }
        }
    }
}

fn eval_binary(op: BinaryOp, l: &Value, r: &Value) -> Result<Value, EvalError> {
    match op {
        BinaryOp::Add => match (l, r) {
            // `+` concatenates when either side is a string.
            (Value::String(_), _) | (_, Value::String(_)) => {
                Ok(Value::String(format!("{}{}", l, r)))
            }
            _ => Ok(Value::Number(as_number(l)? + as_number(r)?)),
        },
        BinaryOp::Sub => Ok(Value::Number(as_number(l)? - as_number(r)?)),
        BinaryOp::Mul => Ok(Value::Number(as_number(l)? * as_number(r)?)),
        BinaryOp::Div => Ok(Value::Number(as_number(l)? / as_number(r)?)),
        BinaryOp::Rem => Ok(Value::Number(as_number(l)? % as_number(r)?)),
        BinaryOp::Eq => Ok(Value::Bool(l == r)),
        BinaryOp::Ne => Ok(Value::Bool(l != r)),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            let ordering = match (l, r) {
                (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                _ => {
                    return Err(EvalError::Type(format!(
                        "cannot compare {} with {}",
                        l.type_name(),
                        r.type_name()
                    )));
                }
            };
            let Some(ordering) = ordering else {
                // NaN comparisons are always false.
                return Ok(Value::Bool(false));
            };
            let result = match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::LtEq => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            };
            Ok(Value::Bool(result))
        }
        BinaryOp::And | BinaryOp::Or => unreachable!("short-circuited above"),
    }
}

fn as_number(value: &Value) -> Result<f64, EvalError> {
    match value {
        Value::Number(n) => Ok(*n),
        other => Err(EvalError::Type(format!(
            "cannot use {} as a number",
            other.type_name()
        ))),
    }
}

/// Pure builtins. Returns None for names the host must handle.
fn call_builtin(name: &str, args: &[Value]) -> Option<Result<Value, EvalError>> {
    let result = match name {
        "len" => one_arg(name, args).map(|v| match v {
            Value::String(s) => Ok(Value::Number(s.chars().count() as f64)),
            Value::List(items) => Ok(Value::Number(items.len() as f64)),
            Value::Object(map) => Ok(Value::Number(map.len() as f64)),
            other => Err(EvalError::Type(format!(
                "len() expects a string, list or object, got {}",
                other.type_name()
            ))),
        }),
        "upper" => one_string(name, args).map(|s| Ok(Value::String(s.to_uppercase()))),
        "lower" => one_string(name, args).map(|s| Ok(Value::String(s.to_lowercase()))),
        "trim" => one_string(name, args).map(|s| Ok(Value::String(s.trim().to_string()))),
        _ => return None,
    };
    Some(result.and_then(|r| r))
}

fn one_arg<'a>(name: &str, args: &'a [Value]) -> Result<&'a Value, EvalError> {
    match args {
        [value] => Ok(value),
        _ => Err(EvalError::Type(format!(
            "{}() expects exactly one argument, got {}",
            name,
            args.len()
        ))),
    }
}

fn one_string<'a>(name: &str, args: &'a [Value]) -> Result<&'a str, EvalError> {
    match one_arg(name, args)? {
        Value::String(s) => Ok(s),
        other => Err(EvalError::Type(format!(
            "{}() expects a string, got {}",
            name,
            other.type_name()
        ))),
    }
}
