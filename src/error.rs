//! Error types for the parley CLI.
//!
//! Uses thiserror for derive macros. Only dispatch-fatal conditions live
//! here; contained evaluation problems (failed expressions, unreadable
//! files, circular includes) travel as [`crate::processor::Diagnostic`]
//! values instead and never become errors.

use crate::eval::EvalError;
use crate::exit_codes;
use thiserror::Error;

/// Main error type for parley operations.
///
/// Frontmatter failures are dispatch-fatal because no variables can be
/// trusted after one; callers must not build a prompt on top of them.
#[derive(Error, Debug)]
pub enum ParleyError {
    /// The frontmatter fence declared a language no handler is registered
    /// for.
    #[error("unsupported frontmatter language '{0}'")]
    UnsupportedFrontmatterLanguage(String),

    /// A structured-data frontmatter body failed to parse.
    #[error("{language} frontmatter parse error: {message}")]
    FrontmatterParse { language: String, message: String },

    /// A structured-data frontmatter body parsed to something other than
    /// a keyed record.
    #[error("frontmatter must be an object, got {0}")]
    FrontmatterNotObject(String),

    /// A script frontmatter body failed to execute.
    #[error("frontmatter script failed: {0}")]
    FrontmatterScript(#[source] EvalError),

    /// User provided invalid arguments or an unreadable input file.
    #[error("{0}")]
    UserError(String),

    /// `check` found evaluation diagnostics.
    #[error("{0} diagnostic(s) produced")]
    DiagnosticsFound(usize),
}

impl ParleyError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ParleyError::UnsupportedFrontmatterLanguage(_)
            | ParleyError::FrontmatterParse { .. }
            | ParleyError::FrontmatterNotObject(_)
            | ParleyError::FrontmatterScript(_) => exit_codes::FRONTMATTER_FAILURE,
            ParleyError::UserError(_) => exit_codes::USER_ERROR,
            ParleyError::DiagnosticsFound(_) => exit_codes::DIAGNOSTIC_FAILURE,
        }
    }
}

/// Result type alias for parley operations.
pub type Result<T> = std::result::Result<T, ParleyError>;
