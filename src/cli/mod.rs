//! CLI argument parsing for parley.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Parser, Subcommand};

/// Parley: file-based prompt compiler for role-tagged LLM chat documents.
///
/// A prompt file is an optional fenced frontmatter block followed by
/// `@<Role>:` messages. Parley parses it, evaluates frontmatter and
/// inline expressions, resolves file references, and assembles a
/// provider-agnostic prompt.
#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for parley.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile a prompt file and print the assembled prompt.
    ///
    /// Runs the full dispatch pipeline: parse, frontmatter (once),
    /// evaluation, assembly. Diagnostics go to stderr.
    Render(RenderArgs),

    /// Parse and evaluate a prompt file, reporting diagnostics.
    ///
    /// Exits non-zero when any diagnostic is produced, so CI can gate on
    /// clean prompts.
    Check(CheckArgs),

    /// Evaluate a prompt file's frontmatter and print the resulting
    /// variable bindings as JSON.
    Vars(VarsArgs),
}

/// Arguments for the `render` command.
#[derive(Parser, Debug)]
pub struct RenderArgs {
    /// Path to the prompt file.
    pub file: String,

    /// Emit the prompt as JSON with provider-neutral parts.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `check` command.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Path to the prompt file.
    pub file: String,
}

/// Arguments for the `vars` command.
#[derive(Parser, Debug)]
pub struct VarsArgs {
    /// Path to the prompt file.
    pub file: String,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_debug_assert() {
        // Verifies the CLI arguments configuration is valid
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_render() {
        let cli = Cli::try_parse_from(["parley", "render", "chat.md"]).unwrap();
        if let Command::Render(args) = cli.command {
            assert_eq!(args.file, "chat.md");
            assert!(!args.json);
        } else {
            panic!("Expected Render command");
        }
    }

    #[test]
    fn parse_render_json() {
        let cli = Cli::try_parse_from(["parley", "render", "chat.md", "--json"]).unwrap();
        if let Command::Render(args) = cli.command {
            assert!(args.json);
        } else {
            panic!("Expected Render command");
        }
    }

    #[test]
    fn parse_check() {
        let cli = Cli::try_parse_from(["parley", "check", "chat.md"]).unwrap();
        if let Command::Check(args) = cli.command {
            assert_eq!(args.file, "chat.md");
        } else {
            panic!("Expected Check command");
        }
    }

    #[test]
    fn parse_vars() {
        let cli = Cli::try_parse_from(["parley", "vars", "chat.md"]).unwrap();
        if let Command::Vars(args) = cli.command {
            assert_eq!(args.file, "chat.md");
        } else {
            panic!("Expected Vars command");
        }
    }

    #[test]
    fn missing_file_argument_fails() {
        assert!(Cli::try_parse_from(["parley", "render"]).is_err());
    }
}
