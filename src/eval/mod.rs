//! The built-in expression language.
//!
//! Used in two places: `{{ … }}` spans inside user messages, and `script`
//! frontmatter blocks. The language is small by intent: literals,
//! arithmetic, comparisons, logic, member/index access, and function calls.
//! Pure builtins (`len`, `upper`, `lower`, `trim`) are always available;
//! everything else goes through the [`HostFns`] seam so the caller decides
//! what the expression may reach (the processor provides `include`,
//! frontmatter provides nothing).

pub mod interp;
pub mod lexer;
pub mod parser;
pub mod value;

pub use interp::{Env, HostFns, NoHostFns, evaluate, run_script};
pub use parser::{Expr, Stmt, parse_expression, parse_script};
pub use value::Value;

use thiserror::Error;

/// Failure of expression parsing or evaluation.
///
/// These are never fatal on their own: the processor contains them as
/// diagnostics, and the frontmatter layer wraps them into its own fatal
/// error when a script block fails.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    /// Tokenization or parse failure.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// A variable was referenced but is not bound in the environment.
    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),

    /// A function name neither a builtin nor provided by the host.
    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    /// An operation was applied to values of the wrong type.
    #[error("type error: {0}")]
    Type(String),

    /// A host function failed (e.g. a circular include).
    #[error("{0}")]
    Host(String),

    /// Expression nesting exceeded the evaluation depth bound.
    #[error("expression nesting too deep")]
    DepthExceeded,
}

/// Parse and evaluate a single expression in one step.
pub fn eval_expression(
    source: &str,
    env: &Env,
    host: &mut dyn HostFns,
) -> Result<Value, EvalError> {
    let expr = parse_expression(source)?;
    evaluate(&expr, env, host)
}

/// Parse and run a script in one step, mutating `env`.
pub fn eval_script(source: &str, env: &mut Env, host: &mut dyn HostFns) -> Result<(), EvalError> {
    let statements = parse_script(source)?;
    run_script(&statements, env, host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eval_expression_end_to_end() {
        let mut env = Env::new();
        env.set("n", Value::Number(3.0));
        let value = eval_expression("n * 2", &env, &mut NoHostFns).unwrap();
        assert_eq!(value, Value::Number(6.0));
    }

    #[test]
    fn eval_script_end_to_end() {
        let mut env = Env::new();
        eval_script("a = 1\nb = a + 1", &mut env, &mut NoHostFns).unwrap();
        assert_eq!(env.get("b"), Some(&Value::Number(2.0)));
    }

    #[test]
    fn syntax_errors_surface() {
        let env = Env::new();
        assert!(matches!(
            eval_expression("1 +", &env, &mut NoHostFns).unwrap_err(),
            EvalError::Syntax(_)
        ));
    }
}
