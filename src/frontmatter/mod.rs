//! Frontmatter detection and execution.
//!
//! A document may open with a fenced block declaring a scripting or data
//! language:
//!
//! ````text
//! ```json
//! { "model": "small" }
//! ```
//! @You: ...
//! ````
//!
//! Detection is the parser's concern and lives here as a pure helper;
//! execution dispatches on the language tag through a registered-handler
//! map. Three handlers ship by default: `json` and `yaml` (structured
//! data, must parse to a keyed record) and `script` (the built-in
//! expression language, run against the context's evaluation environment).
//! Execution failures are dispatch-fatal: no variables can be trusted
//! after one.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex::Regex;

use crate::context::{Context, FILENAME_VAR};
use crate::error::{ParleyError, Result};
use crate::eval::{self, NoHostFns, Value};

/// Variable bindings produced by one frontmatter execution.
pub type Bindings = BTreeMap<String, Value>;

static FENCE_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```([A-Za-z0-9_+.-]+)$").expect("valid fence regex"));

/// The closing fence line, matched exactly.
const FENCE_CLOSE: &str = "```";

/// A detected frontmatter block.
#[derive(Debug, Clone, PartialEq)]
pub struct Detected {
    /// Language tag after the opening fence.
    pub language: String,
    /// Fence body, newline-joined.
    pub code: String,
    /// Number of leading lines consumed (opening fence through closing
    /// fence inclusive). Message lines start after these.
    pub consumed: usize,
}

/// Detect a frontmatter block at the start of `lines`.
///
/// Returns None when the first line is not an opening fence or no closing
/// fence follows; in both cases every line is message content and the
/// would-be fence stays literal text.
pub fn detect(lines: &[&str]) -> Option<Detected> {
    let first = lines.first()?;
    let captures = FENCE_OPEN.captures(first)?;
    let close = lines[1..].iter().position(|line| *line == FENCE_CLOSE)?;

    Some(Detected {
        language: captures[1].to_string(),
        code: lines[1..1 + close].join("\n"),
        consumed: close + 2,
    })
}

/// Executes one frontmatter language.
pub trait FrontmatterHandler {
    /// Run `code` against `context`, producing the resulting bindings.
    fn execute(&self, code: &str, context: &Context) -> Result<Bindings>;
}

/// Language-tag dispatch for frontmatter execution.
pub struct FrontmatterRegistry {
    handlers: HashMap<String, Box<dyn FrontmatterHandler>>,
}

impl FrontmatterRegistry {
    /// An empty registry. Useful for tests that install their own
    /// handlers.
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// The default registry: `json`, `yaml` and `script`.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register("json", JsonFrontmatter);
        registry.register("yaml", YamlFrontmatter);
        registry.register("script", ScriptFrontmatter);
        registry
    }

    /// Register (or replace) the handler for a language tag.
    pub fn register(&mut self, language: &str, handler: impl FrontmatterHandler + 'static) {
        self.handlers.insert(language.to_string(), Box::new(handler));
    }

    /// Execute a frontmatter body. Unknown tags fail with
    /// [`ParleyError::UnsupportedFrontmatterLanguage`].
    pub fn execute(&self, language: &str, code: &str, context: &Context) -> Result<Bindings> {
        match self.handlers.get(language) {
            Some(handler) => handler.execute(code, context),
            None => Err(ParleyError::UnsupportedFrontmatterLanguage(
                language.to_string(),
            )),
        }
    }
}

impl Default for FrontmatterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// `json` frontmatter: the body is a single JSON value and must be an
/// object.
pub struct JsonFrontmatter;

impl FrontmatterHandler for JsonFrontmatter {
    fn execute(&self, code: &str, _context: &Context) -> Result<Bindings> {
        let parsed: serde_json::Value =
            serde_json::from_str(code).map_err(|e| ParleyError::FrontmatterParse {
                language: "json".to_string(),
                message: e.to_string(),
            })?;
        into_bindings(Value::from_json(parsed))
    }
}

/// `yaml` frontmatter: the body is a single YAML document and must be a
/// mapping.
pub struct YamlFrontmatter;

impl FrontmatterHandler for YamlFrontmatter {
    fn execute(&self, code: &str, _context: &Context) -> Result<Bindings> {
        let parsed: serde_yaml::Value =
            serde_yaml::from_str(code).map_err(|e| ParleyError::FrontmatterParse {
                language: "yaml".to_string(),
                message: e.to_string(),
            })?;
        into_bindings(Value::from_yaml(parsed))
    }
}

/// `script` frontmatter: the body runs in the built-in expression
/// language, seeded from the context's evaluation environment, so prior
/// variables and `__filename` are visible and mutable. The resulting
/// environment is captured as the output. `include` is not available
/// here; host functions belong to message evaluation.
pub struct ScriptFrontmatter;

impl FrontmatterHandler for ScriptFrontmatter {
    fn execute(&self, code: &str, context: &Context) -> Result<Bindings> {
        let mut env = context.eval_env();
        eval::eval_script(code, &mut env, &mut NoHostFns)
            .map_err(ParleyError::FrontmatterScript)?;

        let mut bindings = env.into_bindings();
        bindings.remove(FILENAME_VAR);
        Ok(bindings)
    }
}

fn into_bindings(value: Value) -> Result<Bindings> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ParleyError::FrontmatterNotObject(
            other.type_name().to_string(),
        )),
    }
}
