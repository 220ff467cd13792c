//! Dispatch pipeline: source → Document → Context → Prompt.
//!
//! The pipeline is the enforcement point of the exactly-once frontmatter
//! contract. One logical dispatch (one end-to-end turn from raw document
//! to assembled prompt) must execute frontmatter exactly once, no matter
//! how many downstream consumers need the resulting context. Callers that
//! need the evaluated frontmatter before running the pipeline (e.g. to
//! inspect override directives) evaluate once themselves and pass the
//! result in; otherwise the pipeline evaluates internally. Either way the
//! evaluated value is returned so the dispatch driver can cache it for
//! the rest of the turn. A new dispatch always starts fresh; the cache
//! is scoped to one turn, never persisted.

use serde::Serialize;

use crate::ast::Document;
use crate::context::Context;
use crate::error::Result;
use crate::frontmatter::FrontmatterRegistry;
use crate::parser;
use crate::parts::Part;
use crate::processor::{Diagnostic, Evaluated, EvaluatedFrontmatter, EvaluatedMessage, Processor};
use crate::resolver::ContentResolver;

/// The assembled provider-agnostic prompt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prompt {
    /// Content of a single leading System message, when present.
    pub system: Option<String>,
    /// All other messages, in source order.
    pub history: Vec<EvaluatedMessage>,
    /// Evaluation diagnostics, in source order.
    pub diagnostics: Vec<Diagnostic>,
}

/// Orchestrates parsing, frontmatter evaluation and processing.
pub struct Pipeline<'a> {
    processor: Processor<'a>,
}

impl<'a> Pipeline<'a> {
    pub fn new(resolver: &'a dyn ContentResolver, registry: &'a FrontmatterRegistry) -> Self {
        Self {
            processor: Processor::new(resolver, registry),
        }
    }

    /// Run one dispatch over a parsed document.
    ///
    /// When `evaluated` is `Some`, it is reused verbatim and frontmatter
    /// execution is skipped; when `None`, the pipeline evaluates exactly
    /// once. The evaluated value is returned either way.
    pub fn run(
        &self,
        document: &Document,
        context: &Context,
        evaluated: Option<EvaluatedFrontmatter>,
    ) -> Result<(Prompt, EvaluatedFrontmatter)> {
        let frontmatter = match evaluated {
            Some(value) => value,
            None => self.processor.evaluate_frontmatter(document, context)?,
        };

        let result = self
            .processor
            .evaluate(document, &frontmatter.apply(context));

        Ok((assemble(result), frontmatter))
    }

    /// Run one dispatch over raw source, parsing first.
    pub fn run_source(
        &self,
        source: &str,
        context: &Context,
        evaluated: Option<EvaluatedFrontmatter>,
    ) -> Result<(Prompt, EvaluatedFrontmatter)> {
        let document = parser::parse(source);
        self.run(&document, context, evaluated)
    }
}

/// Partition evaluated messages into the prompt shape: a single leading
/// System message becomes the system string, everything else is history.
fn assemble(evaluated: Evaluated) -> Prompt {
    let mut messages = evaluated.messages.into_iter();
    let mut system = None;
    let mut history = Vec::new();

    if let Some(first) = messages.next() {
        if first.role == crate::ast::Role::System {
            system = Some(message_text(&first));
        } else {
            history.push(first);
        }
    }
    history.extend(messages);

    Prompt {
        system,
        history,
        diagnostics: evaluated.diagnostics,
    }
}

/// The coalesced text of a message's parts. Thinking parts carry no
/// prompt text.
fn message_text(message: &EvaluatedMessage) -> String {
    let mut text = String::new();
    for part in &message.parts {
        match part {
            Part::Text { text: t } => text.push_str(t),
            Part::File { content, .. } => text.push_str(&String::from_utf8_lossy(content)),
            Part::Thinking { .. } => {}
        }
    }
    text
}
