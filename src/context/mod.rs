//! Scoped evaluation context.
//!
//! A [`Context`] is an immutable node in a scope chain. Extending or
//! specializing a context never copies ancestry data: the child holds a
//! reference to its parent and lookups walk the chain. Three constructors
//! cover the lifecycle:
//!
//! - [`Context::from_source`]: root context bound to a source identity;
//! - [`Context::extend`]: adds variable bindings (frontmatter results,
//!   child shadows parent);
//! - [`Context::for_include`]: switches the source identity for a nested
//!   include, appending to the include stack.
//!
//! The include stack is only carried here; cycle detection is the
//! processor's responsibility before each descent.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::eval::{Env, Value};

/// Reserved variable exposing the context's source identity to
/// expressions and frontmatter scripts.
pub const FILENAME_VAR: &str = "__filename";

/// An immutable scope-chain node. Cloning is cheap (reference bump).
#[derive(Debug, Clone)]
pub struct Context {
    node: Rc<Node>,
}

#[derive(Debug)]
struct Node {
    /// Source identity this node evaluates under.
    filename: String,
    /// Bindings introduced at this node.
    variables: BTreeMap<String, Value>,
    /// True for nodes that open a new source (root and includes), the
    /// nodes that form the include stack.
    source_boundary: bool,
    parent: Option<Rc<Node>>,
}

impl Context {
    /// Root context for a source. Empty variables, single-element include
    /// stack.
    pub fn from_source(filename: impl Into<String>) -> Self {
        Self {
            node: Rc::new(Node {
                filename: filename.into(),
                variables: BTreeMap::new(),
                source_boundary: true,
                parent: None,
            }),
        }
    }

    /// Child context with additional bindings. Same filename and include
    /// stack; the new bindings shadow any parent bindings of the same name.
    pub fn extend(&self, variables: BTreeMap<String, Value>) -> Self {
        Self {
            node: Rc::new(Node {
                filename: self.node.filename.clone(),
                variables,
                source_boundary: false,
                parent: Some(Rc::clone(&self.node)),
            }),
        }
    }

    /// Child context for evaluating an included source. Inherits all
    /// variables through the chain; appends `filename` to the include
    /// stack. Callers must run the cycle check first (see
    /// [`Context::in_include_stack`]).
    pub fn for_include(&self, filename: impl Into<String>) -> Self {
        Self {
            node: Rc::new(Node {
                filename: filename.into(),
                variables: BTreeMap::new(),
                source_boundary: true,
                parent: Some(Rc::clone(&self.node)),
            }),
        }
    }

    /// The source identity of this context.
    pub fn filename(&self) -> &str {
        &self.node.filename
    }

    /// Flattened variable merge along the parent chain; bindings nearer to
    /// this node shadow those further up.
    pub fn variables(&self) -> BTreeMap<String, Value> {
        let mut merged = BTreeMap::new();
        let mut current = Some(&self.node);
        while let Some(node) = current {
            for (name, value) in &node.variables {
                merged.entry(name.clone()).or_insert_with(|| value.clone());
            }
            current = node.parent.as_ref();
        }
        merged
    }

    /// The chain of source identities currently being expanded, root
    /// first.
    pub fn include_stack(&self) -> Vec<String> {
        let mut stack = Vec::new();
        let mut current = Some(&self.node);
        while let Some(node) = current {
            if node.source_boundary {
                stack.push(node.filename.clone());
            }
            current = node.parent.as_ref();
        }
        stack.reverse();
        stack
    }

    /// Whether `filename` is already being expanded somewhere up the
    /// chain. The processor's cycle-detection gate.
    pub fn in_include_stack(&self, filename: &str) -> bool {
        let mut current = Some(&self.node);
        while let Some(node) = current {
            if node.source_boundary && node.filename == filename {
                return true;
            }
            current = node.parent.as_ref();
        }
        false
    }

    /// Project this context into a flat evaluation environment: the merged
    /// variables plus the reserved [`FILENAME_VAR`] binding.
    pub fn eval_env(&self) -> Env {
        let mut bindings = self.variables();
        bindings.insert(
            FILENAME_VAR.to_string(),
            Value::String(self.node.filename.clone()),
        );
        Env::from_bindings(bindings)
    }
}
