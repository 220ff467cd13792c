//! Command implementations for parley.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations. Every command is one dispatch cycle: the prompt file
//! is read, parsed, and its frontmatter evaluated exactly once.

mod check;
mod render;
mod vars;

use crate::cli::Command;
use crate::error::{ParleyError, Result};

/// Dispatch a command to its implementation.
pub fn dispatch(command: Command) -> Result<()> {
    match command {
        Command::Render(args) => render::cmd_render(args),
        Command::Check(args) => check::cmd_check(args),
        Command::Vars(args) => vars::cmd_vars(args),
    }
}

/// Read a prompt file, mapping I/O failures to a user-actionable error.
fn load_source(path: &str) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        ParleyError::UserError(format!("failed to read prompt file '{}': {}", path, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::RenderArgs;
    use crate::exit_codes;

    #[test]
    fn missing_file_is_a_user_error() {
        let result = load_source("definitely/not/here.md");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
        assert!(err.to_string().contains("definitely/not/here.md"));
    }

    #[test]
    fn dispatch_routes_to_render() {
        let result = dispatch(Command::Render(RenderArgs {
            file: "definitely/not/here.md".to_string(),
            json: false,
        }));
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().exit_code(), exit_codes::USER_ERROR);
    }
}
