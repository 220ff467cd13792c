//! Document evaluation.
//!
//! The processor walks a parsed [`Document`] against a [`Context`] and
//! produces resolved message parts plus an ordered diagnostic list.
//! Evaluation-level failures (a bad expression, an unreadable file, a
//! circular include) are contained: they surface as [`Diagnostic`]
//! values and literal fallback text, never as errors. The only fatal path
//! is frontmatter execution ([`Processor::evaluate_frontmatter`]), whose
//! failures invalidate every variable downstream.
//!
//! # Role policy
//!
//! System and Assistant messages render literally: expression and file
//! reference segments are reconstructed into their original source form,
//! thinking segments become thinking parts, and no diagnostic can arise.
//! User messages are evaluated: expressions run against the context's
//! environment, file references resolve relative to the context's source,
//! and `include(path)` recursively expands another file.

pub mod chunks;
#[cfg(test)]
mod tests;

use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use crate::ast::{Document, Message, Position, Role, Segment};
use crate::context::Context;
use crate::error::Result;
use crate::eval::{self, EvalError, HostFns, Value};
use crate::frontmatter::{Bindings, FrontmatterRegistry};
use crate::parser;
use crate::parts::Part;
use crate::resolver::ContentResolver;

/// How serious a diagnostic is. Evaluation currently only emits warnings;
/// the channel carries errors for hosts that add their own checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

/// What a diagnostic is about.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// An expression failed to parse or evaluate. `source` is the raw
    /// expression text.
    Expression { source: String },
    /// A file reference could not be resolved. `path` is the referenced
    /// (decoded) path.
    File { path: String },
}

/// A non-fatal evaluation problem. Always returned as data alongside the
/// result, never thrown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    #[serde(flatten)]
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub message: String,
    pub position: Option<Position>,
}

impl Diagnostic {
    fn expression_warning(source: &str, message: String, position: Position) -> Self {
        Self {
            kind: DiagnosticKind::Expression {
                source: source.to_string(),
            },
            severity: Severity::Warning,
            message,
            position: Some(position),
        }
    }

    fn file_warning(path: &str, message: String, position: Position) -> Self {
        Self {
            kind: DiagnosticKind::File {
                path: path.to_string(),
            },
            severity: Severity::Warning,
            message,
            position: Some(position),
        }
    }
}

/// One evaluated message: the source role plus its resolved parts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluatedMessage {
    pub role: Role,
    pub parts: Vec<Part>,
}

/// The result of one [`Processor::evaluate`] call. Messages and
/// diagnostics are both in source order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluated {
    pub messages: Vec<EvaluatedMessage>,
    pub diagnostics: Vec<Diagnostic>,
}

/// The captured result of executing a document's frontmatter once.
///
/// This value is the unit of the exactly-once contract: evaluate it once
/// per dispatch, then pass it wherever the resulting bindings are needed
/// instead of re-executing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EvaluatedFrontmatter {
    bindings: Bindings,
}

impl EvaluatedFrontmatter {
    /// The result for a document without frontmatter.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Merge the captured bindings into `context`, producing the context
    /// message evaluation runs under.
    pub fn apply(&self, context: &Context) -> Context {
        context.extend(self.bindings.clone())
    }
}

/// Walks parsed documents, producing parts and diagnostics.
pub struct Processor<'a> {
    resolver: &'a dyn ContentResolver,
    registry: &'a FrontmatterRegistry,
}

impl<'a> Processor<'a> {
    pub fn new(resolver: &'a dyn ContentResolver, registry: &'a FrontmatterRegistry) -> Self {
        Self { resolver, registry }
    }

    /// Execute the document's frontmatter (if any) against `context`.
    ///
    /// Callers own the exactly-once contract: call this once per dispatch
    /// and reuse the returned value (see [`crate::pipeline::Pipeline`]).
    pub fn evaluate_frontmatter(
        &self,
        document: &Document,
        context: &Context,
    ) -> Result<EvaluatedFrontmatter> {
        match &document.frontmatter {
            Some(frontmatter) => {
                let bindings =
                    self.registry
                        .execute(&frontmatter.language, &frontmatter.code, context)?;
                Ok(EvaluatedFrontmatter { bindings })
            }
            None => Ok(EvaluatedFrontmatter::empty()),
        }
    }

    /// Convenience wrapper: parse `source`, evaluate its frontmatter
    /// exactly once, and return the merged context alongside the captured
    /// result.
    pub fn evaluate_source_frontmatter(
        &self,
        source: &str,
        filename: &str,
    ) -> Result<(Context, EvaluatedFrontmatter)> {
        let document = parser::parse(source);
        let context = Context::from_source(filename);
        let evaluated = self.evaluate_frontmatter(&document, &context)?;
        Ok((evaluated.apply(&context), evaluated))
    }

    /// Evaluate every message of `document` against `context`.
    ///
    /// `context` is expected to already carry the frontmatter bindings
    /// (see [`EvaluatedFrontmatter::apply`]); this call never executes
    /// frontmatter itself.
    pub fn evaluate(&self, document: &Document, context: &Context) -> Evaluated {
        let mut messages = Vec::with_capacity(document.messages.len());
        let mut diagnostics = Vec::new();

        for message in &document.messages {
            let parts = self.evaluate_message(message, context, &mut diagnostics);
            messages.push(EvaluatedMessage {
                role: message.role,
                parts,
            });
        }

        Evaluated {
            messages,
            diagnostics,
        }
    }

    /// Reuse path: apply an already-evaluated frontmatter result and
    /// evaluate the messages, skipping frontmatter execution entirely.
    pub fn evaluate_with_frontmatter(
        &self,
        document: &Document,
        context: &Context,
        evaluated: &EvaluatedFrontmatter,
    ) -> Evaluated {
        self.evaluate(document, &evaluated.apply(context))
    }

    fn evaluate_message(
        &self,
        message: &Message,
        context: &Context,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Vec<Part> {
        match message.role {
            Role::System | Role::Assistant => literal_parts(message),
            Role::User => self.evaluated_parts(message, context, diagnostics),
        }
    }

    fn evaluated_parts(
        &self,
        message: &Message,
        context: &Context,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Vec<Part> {
        let env = context.eval_env();
        let mut builder = PartsBuilder::default();

        for segment in &message.segments {
            match segment {
                Segment::Text { content, .. } => builder.push_str(content),
                Segment::Thinking { content, .. } => builder.push_part(Part::Thinking {
                    text: content.clone(),
                }),
                Segment::Expression { source, position } => {
                    let mut host = IncludeHost {
                        processor: self,
                        context,
                        nested: Vec::new(),
                    };
                    let result = eval::eval_expression(source, &env, &mut host);
                    diagnostics.extend(host.nested);
                    match result {
                        Ok(value) => builder.push_str(&value.to_string()),
                        Err(err) => {
                            // Failure keeps the original delimited text in
                            // place so nothing silently disappears.
                            builder.push_str(&format!("{{{{{}}}}}", source));
                            diagnostics.push(Diagnostic::expression_warning(
                                source,
                                format!("failed to evaluate '{}': {}", source.trim(), err),
                                *position,
                            ));
                        }
                    }
                }
                Segment::FileReference {
                    path,
                    mime_override,
                    position,
                    ..
                } => {
                    let resolved = resolve_relative(context.filename(), path);
                    match self.resolver.read(&resolved) {
                        Ok(content) => {
                            let mime = match mime_override {
                                Some(mime) => mime.clone(),
                                None => self
                                    .resolver
                                    .mime_of(&resolved)
                                    .unwrap_or_else(|_| "application/octet-stream".to_string()),
                            };
                            builder.push_part(Part::File {
                                path: resolved.display().to_string(),
                                mime,
                                content,
                            });
                        }
                        Err(err) => {
                            diagnostics.push(Diagnostic::file_warning(
                                path,
                                format!("failed to read '{}': {}", resolved.display(), err),
                                *position,
                            ));
                        }
                    }
                }
            }
        }

        builder.finish()
    }
}

/// Host functions available during user-message expression evaluation.
/// `include(path)` is the recursive-inclusion primitive.
struct IncludeHost<'p, 'a> {
    processor: &'p Processor<'a>,
    context: &'p Context,
    /// Diagnostics produced by nested evaluations, appended to the outer
    /// list after the expression completes.
    nested: Vec<Diagnostic>,
}

impl HostFns for IncludeHost<'_, '_> {
    fn call(&mut self, name: &str, args: &[Value]) -> std::result::Result<Value, EvalError> {
        if name != "include" {
            return Err(EvalError::UnknownFunction(name.to_string()));
        }
        let [Value::String(path)] = args else {
            return Err(EvalError::Type(
                "include() expects a single path string".to_string(),
            ));
        };

        let resolved = resolve_relative(self.context.filename(), path);
        let identity = resolved.display().to_string();

        // Cycle gate: refuse to descend into a source already being
        // expanded. Contained like any other expression failure.
        if self.context.in_include_stack(&identity) {
            return Err(EvalError::Host(format!(
                "circular include of '{}'",
                identity
            )));
        }

        let bytes = self
            .processor
            .resolver
            .read(&resolved)
            .map_err(|err| EvalError::Host(format!("failed to read '{}': {}", identity, err)))?;
        let source = String::from_utf8_lossy(&bytes);

        let document = parser::parse(&source);
        let included_context = self.context.for_include(identity);

        // Fragment files carry no role lines; their whole content is one
        // user-message body. Files with role structure evaluate as full
        // documents. Included frontmatter is never executed.
        let document = if document.messages.is_empty() && document.frontmatter.is_none() {
            let segments = parser::parse_fragment(&source);
            let line_count = source.lines().count().max(1);
            Document {
                frontmatter: None,
                messages: vec![Message {
                    role: Role::User,
                    segments,
                    position: Position::new(1, line_count),
                }],
                position: Some(Position::new(1, line_count)),
            }
        } else {
            document
        };

        let evaluated = self.processor.evaluate(&document, &included_context);
        self.nested.extend(evaluated.diagnostics);

        Ok(Value::String(flatten_messages(&evaluated.messages)))
    }
}

/// Flatten evaluated messages into plain text for include splicing: text
/// parts and the lossy-decoded content of file parts, thinking dropped.
fn flatten_messages(messages: &[EvaluatedMessage]) -> String {
    let mut texts = Vec::new();
    for message in messages {
        let mut text = String::new();
        for part in &message.parts {
            match part {
                Part::Text { text: t } => text.push_str(t),
                Part::File { content, .. } => {
                    text.push_str(&String::from_utf8_lossy(content));
                }
                Part::Thinking { .. } => {}
            }
        }
        texts.push(text);
    }
    texts.join("\n")
}

/// Render a System or Assistant message literally: delimiters
/// reconstructed, thinking preserved as parts.
fn literal_parts(message: &Message) -> Vec<Part> {
    let mut builder = PartsBuilder::default();
    for segment in &message.segments {
        match segment {
            Segment::Text { content, .. } => builder.push_str(content),
            Segment::Expression { source, .. } => {
                builder.push_str(&format!("{{{{{}}}}}", source));
            }
            Segment::FileReference { raw, .. } => builder.push_str(raw),
            Segment::Thinking { content, .. } => builder.push_part(Part::Thinking {
                text: content.clone(),
            }),
        }
    }
    builder.finish()
}

/// Accumulates parts, coalescing adjacent text into minimal-length text
/// parts.
#[derive(Default)]
struct PartsBuilder {
    parts: Vec<Part>,
    buffer: String,
}

impl PartsBuilder {
    fn push_str(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    fn push_part(&mut self, part: Part) {
        self.flush();
        self.parts.push(part);
    }

    fn flush(&mut self) {
        if !self.buffer.is_empty() {
            self.parts.push(Part::Text {
                text: std::mem::take(&mut self.buffer),
            });
        }
    }

    fn finish(mut self) -> Vec<Part> {
        self.flush();
        self.parts
    }
}

/// Resolve `target` against the directory of `base`, normalizing `.` and
/// `..` components lexically so include identities compare stably.
fn resolve_relative(base: &str, target: &str) -> PathBuf {
    let target_path = Path::new(target);
    let joined = if target_path.is_absolute() {
        target_path.to_path_buf()
    } else {
        match Path::new(base).parent() {
            Some(parent) => parent.join(target_path),
            None => target_path.to_path_buf(),
        }
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
