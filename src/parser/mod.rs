//! Single-pass line-oriented parser for prompt documents.
//!
//! Parsing is total: malformed input never fails, it degrades to literal
//! text. An unclosed frontmatter fence, an unclosed `{{`, an unclosed
//! `<think>` tag: all stay in the document as ordinary message content.
//!
//! The pass runs in three steps:
//!
//! 1. Frontmatter detection ([`crate::frontmatter::detect`]): captured
//!    raw, executed later by the frontmatter component.
//! 2. Message segmentation: a `@<Role>:` line starts a new message; all
//!    following lines up to the next role line belong to it. Lines before
//!    the first role line belong to no message.
//! 3. Segment tokenization ([`inline`]): expressions, file references
//!    and (for Assistant messages) thinking blocks are split out of the
//!    literal text. Applied uniformly regardless of role; role-based
//!    suppression happens at evaluation time.

mod inline;

use std::sync::LazyLock;

use regex::Regex;

use crate::ast::{Document, Message, Position, RawFrontmatter, Role, Segment};
use crate::frontmatter;

static ROLE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@(System|You|User|Assistant): ?(.*)$").expect("valid role regex"));

/// Opening tag of a thinking block, on its own line.
const THINK_OPEN: &str = "<think>";
/// Closing tag of a thinking block, on its own line.
const THINK_CLOSE: &str = "</think>";

/// Parse a full source string. Lines are split on `\n` (a trailing `\r`
/// is stripped, so CRLF input parses the same).
pub fn parse(source: &str) -> Document {
    let lines: Vec<&str> = source.lines().collect();
    parse_lines(&lines)
}

/// Parse a document from its lines. Never fails; an empty input produces
/// an empty document.
pub fn parse_lines(lines: &[&str]) -> Document {
    if lines.is_empty() {
        return Document::empty();
    }

    let (raw_frontmatter, consumed) = match frontmatter::detect(lines) {
        Some(detected) => {
            let position = Position::new(1, detected.consumed);
            (
                Some(RawFrontmatter {
                    language: detected.language,
                    code: detected.code,
                    position,
                }),
                detected.consumed,
            )
        }
        None => (None, 0),
    };

    let messages = parse_messages(&lines[consumed..], consumed + 1);

    Document {
        frontmatter: raw_frontmatter,
        messages,
        position: Some(Position::new(1, lines.len())),
    }
}

/// Tokenize a source fragment with no role structure as one run of
/// message content. Include resolution uses this for plain fragment
/// files, which have no `@<Role>:` lines of their own.
pub(crate) fn parse_fragment(source: &str) -> Vec<Segment> {
    let text = source.lines().collect::<Vec<_>>().join("\n");
    inline::tokenize(&text, 1)
}

/// One line of message content with its absolute 1-indexed line number.
struct ContentLine<'a> {
    number: usize,
    text: &'a str,
}

fn parse_messages(lines: &[&str], first_line_number: usize) -> Vec<Message> {
    let mut messages = Vec::new();
    let mut current: Option<(Role, Vec<ContentLine<'_>>, usize)> = None;

    for (offset, line) in lines.iter().enumerate() {
        let number = first_line_number + offset;
        if let Some(captures) = ROLE_LINE.captures(line) {
            if let Some((role, content, start)) = current.take() {
                messages.push(build_message(role, content, start, number - 1));
            }
            let role = Role::from_tag(&captures[1]).expect("regex admits only known roles");
            let rest = captures.get(2).map(|m| m.as_str()).unwrap_or("");
            current = Some((
                role,
                vec![ContentLine {
                    number,
                    text: rest,
                }],
                number,
            ));
        } else if let Some((_, content, _)) = current.as_mut() {
            content.push(ContentLine { number, text: line });
        }
        // Lines before the first role line belong to no message.
    }

    if let Some((role, content, start)) = current.take() {
        let end = first_line_number + lines.len() - 1;
        messages.push(build_message(role, content, start, end));
    }

    messages
}

fn build_message(
    role: Role,
    content: Vec<ContentLine<'_>>,
    start_line: usize,
    end_line: usize,
) -> Message {
    let mut segments = Vec::new();
    let mut run: Vec<&ContentLine<'_>> = Vec::new();
    let mut i = 0;

    while i < content.len() {
        let line = &content[i];
        // Thinking blocks are only recognized inside Assistant messages;
        // for other roles the tag lines are ordinary text.
        if role == Role::Assistant && line.text == THINK_OPEN {
            if let Some(close) = content[i + 1..].iter().position(|l| l.text == THINK_CLOSE) {
                flush_run(&mut segments, &mut run);
                let inner = &content[i + 1..i + 1 + close];
                let body = inner
                    .iter()
                    .map(|l| l.text)
                    .collect::<Vec<_>>()
                    .join("\n");
                segments.push(Segment::Thinking {
                    content: body,
                    position: Position::new(line.number, content[i + 1 + close].number),
                });
                i += close + 2;
                continue;
            }
            // Unclosed tag: literal text.
        }
        run.push(line);
        i += 1;
    }

    flush_run(&mut segments, &mut run);

    Message {
        role,
        segments,
        position: Position::new(start_line, end_line),
    }
}

fn flush_run(segments: &mut Vec<Segment>, run: &mut Vec<&ContentLine<'_>>) {
    if run.is_empty() {
        return;
    }
    let start_line = run[0].number;
    let text = run
        .iter()
        .map(|l| l.text)
        .collect::<Vec<_>>()
        .join("\n");
    segments.extend(inline::tokenize(&text, start_line));
    run.clear();
}
