//! Parley turns a role-tagged chat document into a normalized,
//! provider-agnostic prompt.
//!
//! A prompt file is an optional fenced frontmatter block followed by
//! `@<Role>:` messages with inline `{{ … }}` expressions, `@path` file
//! references, and (in Assistant messages) `<think>` blocks. One dispatch
//! runs:
//!
//! ```text
//! raw lines
//!   → parser        (Document: raw frontmatter + messages + segments)
//!   → frontmatter   (executed once per dispatch → variable bindings)
//!   → context       (immutable scope chain + include stack)
//!   → processor     (parts + diagnostics, includes resolved recursively)
//!   → pipeline      (Prompt { system, history } for provider builders)
//! ```
//!
//! Evaluation failures never abort a dispatch: bad expressions, missing
//! files and circular includes surface as [`processor::Diagnostic`]
//! values plus literal fallback text. Only frontmatter failures are
//! fatal.
//!
//! # Example
//!
//! ```
//! use parley::context::Context;
//! use parley::frontmatter::FrontmatterRegistry;
//! use parley::pipeline::Pipeline;
//! use parley::resolver::FsResolver;
//!
//! let source = "@System: Be brief.\n@You: two is {{ 1 + 1 }}";
//! let registry = FrontmatterRegistry::new();
//! let pipeline = Pipeline::new(&FsResolver, &registry);
//! let context = Context::from_source("chat.md");
//!
//! let (prompt, _frontmatter) = pipeline.run_source(source, &context, None)?;
//! assert_eq!(prompt.system.as_deref(), Some("Be brief."));
//! assert_eq!(prompt.history.len(), 1);
//! # Ok::<(), parley::error::ParleyError>(())
//! ```

pub mod ast;
pub mod cli;
pub mod commands;
pub mod context;
pub mod error;
pub mod eval;
pub mod exit_codes;
pub mod frontmatter;
pub mod parser;
pub mod parts;
pub mod pipeline;
pub mod processor;
pub mod resolver;
