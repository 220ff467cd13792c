//! The `render` command: compile a prompt file and print the result.

use serde::Serialize;

use crate::ast::Role;
use crate::cli::RenderArgs;
use crate::context::Context;
use crate::error::{ParleyError, Result};
use crate::frontmatter::FrontmatterRegistry;
use crate::parts::{GenericPart, Part, to_generic_parts};
use crate::pipeline::{Pipeline, Prompt};
use crate::processor::Diagnostic;
use crate::resolver::FsResolver;

/// JSON shape for `render --json`: the prompt with provider-neutral
/// parts.
#[derive(Serialize)]
struct RenderedPrompt<'a> {
    system: &'a Option<String>,
    history: Vec<RenderedMessage>,
    diagnostics: &'a [Diagnostic],
}

#[derive(Serialize)]
struct RenderedMessage {
    role: Role,
    parts: Vec<GenericPart>,
}

pub fn cmd_render(args: RenderArgs) -> Result<()> {
    let source = super::load_source(&args.file)?;
    let registry = FrontmatterRegistry::new();
    let pipeline = Pipeline::new(&FsResolver, &registry);
    let context = Context::from_source(&args.file);

    let (prompt, _frontmatter) = pipeline.run_source(&source, &context, None)?;

    if args.json {
        print_json(&prompt)
    } else {
        print_transcript(&prompt);
        Ok(())
    }
}

fn print_json(prompt: &Prompt) -> Result<()> {
    let rendered = RenderedPrompt {
        system: &prompt.system,
        history: prompt
            .history
            .iter()
            .map(|message| RenderedMessage {
                role: message.role,
                parts: to_generic_parts(&message.parts),
            })
            .collect(),
        diagnostics: &prompt.diagnostics,
    };
    let json = serde_json::to_string_pretty(&rendered)
        .map_err(|e| ParleyError::UserError(format!("failed to serialize prompt: {}", e)))?;
    println!("{}", json);
    Ok(())
}

fn print_transcript(prompt: &Prompt) {
    for diagnostic in &prompt.diagnostics {
        eprintln!("warning: {}", diagnostic.message);
    }

    if let Some(system) = &prompt.system {
        println!("@System: {}", system);
    }
    for message in &prompt.history {
        print!("@{}: ", message.role);
        for part in &message.parts {
            match part {
                Part::Text { text } => print!("{}", text),
                Part::File { path, mime, .. } => print!("[attachment {} ({})]", path, mime),
                Part::Thinking { text } => {
                    println!("<think>");
                    println!("{}", text);
                    print!("</think>");
                }
            }
        }
        println!();
    }
}
