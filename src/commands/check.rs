//! The `check` command: evaluate a prompt file and report diagnostics.

use crate::cli::CheckArgs;
use crate::context::Context;
use crate::error::{ParleyError, Result};
use crate::frontmatter::FrontmatterRegistry;
use crate::pipeline::Pipeline;
use crate::processor::Diagnostic;
use crate::resolver::FsResolver;

pub fn cmd_check(args: CheckArgs) -> Result<()> {
    let source = super::load_source(&args.file)?;
    let registry = FrontmatterRegistry::new();
    let pipeline = Pipeline::new(&FsResolver, &registry);
    let context = Context::from_source(&args.file);

    let (prompt, _frontmatter) = pipeline.run_source(&source, &context, None)?;

    if prompt.diagnostics.is_empty() {
        println!("{}: no diagnostics", args.file);
        return Ok(());
    }

    for diagnostic in &prompt.diagnostics {
        println!("{}", format_diagnostic(&args.file, diagnostic));
    }
    Err(ParleyError::DiagnosticsFound(prompt.diagnostics.len()))
}

fn format_diagnostic(file: &str, diagnostic: &Diagnostic) -> String {
    let location = match diagnostic.position {
        Some(position) if position.start_line == position.end_line => {
            format!("{}:{}", file, position.start_line)
        }
        Some(position) => format!("{}:{}-{}", file, position.start_line, position.end_line),
        None => file.to_string(),
    };
    format!("{}: warning: {}", location, diagnostic.message)
}
