//! Document model for parley prompt files.
//!
//! This module defines the AST produced by the parser: a [`Document`] holding
//! an optional raw frontmatter block and an ordered list of role-tagged
//! [`Message`]s, each made of inline [`Segment`]s. Nodes are created by the
//! parser and immutable thereafter; evaluation never mutates them.
//!
//! # Document Format
//!
//! ````text
//! ```script
//! model = "small"
//! ```
//! @System: You are concise.
//! @You: Hello {{ 1 + 1 }} world @./notes.txt.
//! @Assistant: answer
//! ````

use serde::Serialize;

/// A 1-indexed inclusive line span attached to every node derived from
/// source lines. Synthetic nodes carry no position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    /// First source line of the node (1-indexed).
    pub start_line: usize,
    /// Last source line of the node (1-indexed, inclusive).
    pub end_line: usize,
}

impl Position {
    /// Create a position covering `start_line..=end_line`.
    pub fn new(start_line: usize, end_line: usize) -> Self {
        Self {
            start_line,
            end_line,
        }
    }

    /// Create a position covering a single line.
    pub fn line(line: usize) -> Self {
        Self::new(line, line)
    }
}

/// The speaker of a message. Role determines evaluation policy:
/// only [`Role::User`] messages have their expressions evaluated and
/// file references resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// System instructions. Rendered literally.
    System,
    /// The human turn (`@You:` or `@User:`). Evaluated.
    User,
    /// The model turn. Rendered literally; may contain thinking blocks.
    Assistant,
}

impl Role {
    /// Parse a role tag as it appears in a `@<Role>:` line.
    ///
    /// Both `You` and `User` map to [`Role::User`].
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "System" => Some(Role::System),
            "You" | "User" => Some(Role::User),
            "Assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Role::System => "System",
            Role::User => "You",
            Role::Assistant => "Assistant",
        };
        write!(f, "{}", name)
    }
}

/// Classification of a segment, independent of its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    Text,
    Expression,
    FileReference,
    Thinking,
}

/// A parse-time unit of a message's content.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Segment {
    /// A literal run of text.
    Text {
        content: String,
        position: Position,
    },
    /// An unevaluated expression span. `source` is the raw text between
    /// the `{{` and `}}` delimiters, captured verbatim.
    Expression {
        source: String,
        position: Position,
    },
    /// An inline file reference (`@<path>[;type=<mime>]`).
    FileReference {
        /// The referenced path, percent-decoded.
        path: String,
        /// The exact source text of the reference, including the leading
        /// `@` and any `;type=` suffix, excluding split-off punctuation.
        raw: String,
        /// Explicit MIME type from a `;type=` suffix, if any.
        mime_override: Option<String>,
        /// Punctuation split off the end of the reference. Also emitted as
        /// the following text segment so no source text is lost.
        trailing_punct: String,
        position: Position,
    },
    /// A thinking block (Assistant messages only). `content` is the
    /// newline-joined lines strictly between the tags.
    Thinking {
        content: String,
        position: Position,
    },
}

impl Segment {
    /// Classify this segment.
    pub fn kind(&self) -> SegmentKind {
        match self {
            Segment::Text { .. } => SegmentKind::Text,
            Segment::Expression { .. } => SegmentKind::Expression,
            Segment::FileReference { .. } => SegmentKind::FileReference,
            Segment::Thinking { .. } => SegmentKind::Thinking,
        }
    }

    /// The line span this segment was derived from.
    pub fn position(&self) -> Position {
        match self {
            Segment::Text { position, .. }
            | Segment::Expression { position, .. }
            | Segment::FileReference { position, .. }
            | Segment::Thinking { position, .. } => *position,
        }
    }
}

/// A single role-tagged message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub role: Role,
    pub segments: Vec<Segment>,
    pub position: Position,
}

/// A raw, unexecuted frontmatter block as captured by the parser.
///
/// Execution is the frontmatter component's concern; the parser only
/// records the declared language tag and the unparsed body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawFrontmatter {
    /// The language tag after the opening fence (e.g. `json`, `script`).
    pub language: String,
    /// The fence body, newline-joined, unparsed.
    pub code: String,
    /// Span from the opening fence line to the closing fence line.
    pub position: Position,
}

/// The root of a parsed prompt document. Re-created per parse, never
/// mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub frontmatter: Option<RawFrontmatter>,
    pub messages: Vec<Message>,
    pub position: Option<Position>,
}

impl Document {
    /// An empty document (no frontmatter, no messages).
    pub fn empty() -> Self {
        Self {
            frontmatter: None,
            messages: Vec::new(),
            position: None,
        }
    }
}
