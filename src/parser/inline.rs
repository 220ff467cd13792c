//! Inline segment tokenizer.
//!
//! Scans a run of message text left to right, splitting out `{{ … }}`
//! expression spans and `@path[;type=mime]` file references from literal
//! text. Applied uniformly at parse time regardless of role; role-based
//! suppression happens at evaluation time.

use crate::ast::{Position, Segment};

/// Punctuation characters split off the end of a file reference so
/// sentence punctuation is not swallowed into the path or MIME value.
const TRAILING_PUNCT: &[char] = &['.', ',', '!', '?', ';', ':', '\'', '"', ')', ']'];

/// Tokenize `text` (newline-joined message lines whose first line is
/// `start_line`) into segments. The concatenation of the produced
/// segments' source text reconstructs `text` exactly.
pub(crate) fn tokenize(text: &str, start_line: usize) -> Vec<Segment> {
    let mut segments = Vec::new();
    let bytes = text.as_bytes();
    let mut buffer = String::new();
    let mut buffer_start_line = start_line;
    let mut line = start_line;
    let mut i = 0;

    while i < bytes.len() {
        let rest = &text[i..];

        // Expression span: first matching close wins; unclosed stays literal.
        if let Some(inner) = rest.strip_prefix("{{") {
            if let Some(close) = inner.find("}}") {
                flush_text(&mut segments, &mut buffer, buffer_start_line, line);
                let source = &inner[..close];
                let end_line = line + source.matches('\n').count();
                segments.push(Segment::Expression {
                    source: source.to_string(),
                    position: Position::new(line, end_line),
                });
                line = end_line;
                i += 2 + close + 2;
                buffer_start_line = line;
                continue;
            }
        }

        // File reference: `@` at start or after whitespace, immediately
        // followed by a non-whitespace path token.
        if rest.starts_with('@') && at_reference_boundary(text, i) {
            let token: &str = rest[1..]
                .split(|c: char| c.is_whitespace())
                .next()
                .unwrap_or("");
            if let Some(reference) = parse_reference(token, line) {
                flush_text(&mut segments, &mut buffer, buffer_start_line, line);
                let consumed = 1 + token.len() - reference.trailing_punct.len();
                // The split-off punctuation opens the next text run so no
                // source text is lost.
                buffer.push_str(&reference.trailing_punct);
                buffer_start_line = line;
                segments.push(reference.segment);
                i += consumed;
                continue;
            }
        }

        let ch = rest.chars().next().expect("non-empty rest");
        buffer.push(ch);
        if ch == '\n' {
            line += 1;
        }
        i += ch.len_utf8();
    }

    flush_text(&mut segments, &mut buffer, buffer_start_line, line);
    segments
}

fn flush_text(segments: &mut Vec<Segment>, buffer: &mut String, start_line: usize, line: usize) {
    if buffer.is_empty() {
        return;
    }
    segments.push(Segment::Text {
        content: std::mem::take(buffer),
        position: Position::new(start_line, line),
    });
}

/// A reference is only recognized when the `@` begins the text or follows
/// whitespace; `user@host` stays literal.
fn at_reference_boundary(text: &str, at_index: usize) -> bool {
    match text[..at_index].chars().next_back() {
        None => true,
        Some(prev) => prev.is_whitespace(),
    }
}

struct ParsedReference {
    segment: Segment,
    trailing_punct: String,
}

/// Parse the non-whitespace token following an `@` into a file reference.
/// Returns None when the token does not form a usable reference (empty
/// path after punctuation splitting), in which case the `@` stays literal.
fn parse_reference(token: &str, line: usize) -> Option<ParsedReference> {
    if token.is_empty() {
        return None;
    }

    let (path_part, mime_part) = match token.find(";type=") {
        Some(at) => (&token[..at], Some(&token[at + ";type=".len()..])),
        None => (token, None),
    };

    // Trailing punctuation comes off the end of the whole reference: the
    // MIME override when present, the path otherwise.
    let (path_part, mime_override, trailing_punct) = match mime_part {
        Some(mime) => {
            let stripped = mime.trim_end_matches(TRAILING_PUNCT);
            if stripped.is_empty() {
                return None;
            }
            let punct = &mime[stripped.len()..];
            (path_part, Some(stripped.to_string()), punct.to_string())
        }
        None => {
            let stripped = path_part.trim_end_matches(TRAILING_PUNCT);
            let punct = &path_part[stripped.len()..];
            (stripped, None, punct.to_string())
        }
    };

    if path_part.is_empty() {
        return None;
    }

    let raw_len = 1 + token.len() - trailing_punct.len();
    let mut raw = String::with_capacity(raw_len);
    raw.push('@');
    raw.push_str(&token[..raw_len - 1]);

    Some(ParsedReference {
        segment: Segment::FileReference {
            path: percent_decode(path_part),
            raw,
            mime_override,
            trailing_punct: trailing_punct.clone(),
            position: Position::line(line),
        },
        trailing_punct,
    })
}

/// Decode `%XX` escapes in a path token. Malformed escapes are kept
/// literal rather than rejected.
pub(crate) fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if let (Some(hi), Some(lo)) = (
                bytes.get(i + 1).copied().and_then(hex_value),
                bytes.get(i + 2).copied().and_then(hex_value),
            ) {
                out.push(hi * 16 + lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::SegmentKind;

    fn kinds(segments: &[Segment]) -> Vec<SegmentKind> {
        segments.iter().map(|s| s.kind()).collect()
    }

    #[test]
    fn plain_text_is_one_segment() {
        let segments = tokenize("just words", 1);
        assert_eq!(
            segments,
            vec![Segment::Text {
                content: "just words".to_string(),
                position: Position::line(1),
            }]
        );
    }

    #[test]
    fn expression_splits_surrounding_text() {
        let segments = tokenize("a {{1+1}} b", 1);
        assert_eq!(
            kinds(&segments),
            vec![
                SegmentKind::Text,
                SegmentKind::Expression,
                SegmentKind::Text
            ]
        );
        assert_eq!(
            segments[1],
            Segment::Expression {
                source: "1+1".to_string(),
                position: Position::line(1),
            }
        );
    }

    #[test]
    fn first_matching_close_wins() {
        let segments = tokenize("{{ a }} b }}", 1);
        let Segment::Expression { source, .. } = &segments[0] else {
            panic!("expected expression");
        };
        assert_eq!(source, " a ");
        assert_eq!(
            segments[1],
            Segment::Text {
                content: " b }}".to_string(),
                position: Position::line(1),
            }
        );
    }

    #[test]
    fn unclosed_expression_stays_literal() {
        let segments = tokenize("a {{ b", 1);
        assert_eq!(
            segments,
            vec![Segment::Text {
                content: "a {{ b".to_string(),
                position: Position::line(1),
            }]
        );
    }

    #[test]
    fn expression_spanning_lines_has_line_span() {
        let segments = tokenize("x {{ 1 +\n2 }} y", 3);
        let Segment::Expression { position, .. } = &segments[1] else {
            panic!("expected expression");
        };
        assert_eq!(*position, Position::new(3, 4));
        // Following text resumes on the second line.
        assert_eq!(
            segments[2],
            Segment::Text {
                content: " y".to_string(),
                position: Position::line(4),
            }
        );
    }

    #[test]
    fn file_reference_with_trailing_punct() {
        let segments = tokenize("see @./a.txt.", 1);
        assert_eq!(
            segments[1],
            Segment::FileReference {
                path: "./a.txt".to_string(),
                raw: "@./a.txt".to_string(),
                mime_override: None,
                trailing_punct: ".".to_string(),
                position: Position::line(1),
            }
        );
        // Punctuation lands in the following text segment.
        assert_eq!(
            segments[2],
            Segment::Text {
                content: ".".to_string(),
                position: Position::line(1),
            }
        );
    }

    #[test]
    fn file_reference_with_mime_override_and_percent_decoding() {
        let segments = tokenize("See @./my%20file.bin;type=image/png!", 1);
        assert_eq!(
            segments[1],
            Segment::FileReference {
                path: "./my file.bin".to_string(),
                raw: "@./my%20file.bin;type=image/png".to_string(),
                mime_override: Some("image/png".to_string()),
                trailing_punct: "!".to_string(),
                position: Position::line(1),
            }
        );
    }

    #[test]
    fn at_in_the_middle_of_a_word_is_literal() {
        let segments = tokenize("mail me at user@example.com ok", 1);
        assert_eq!(segments.len(), 1);
        assert!(matches!(&segments[0], Segment::Text { content, .. }
            if content == "mail me at user@example.com ok"));
    }

    #[test]
    fn lone_at_is_literal() {
        let segments = tokenize("a @ b", 1);
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn punctuation_only_token_is_literal() {
        let segments = tokenize("what @?! now", 1);
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn spec_example_segment_sequence() {
        let segments = tokenize("Hello {{1+1}} world @./a.txt.", 1);
        assert_eq!(
            kinds(&segments),
            vec![
                SegmentKind::Text,
                SegmentKind::Expression,
                SegmentKind::Text,
                SegmentKind::FileReference,
                SegmentKind::Text,
            ]
        );
        assert!(matches!(&segments[0], Segment::Text { content, .. } if content == "Hello "));
        assert!(
            matches!(&segments[1], Segment::Expression { source, .. } if source == "1+1")
        );
        assert!(
            matches!(&segments[2], Segment::Text { content, .. } if content == " world ")
        );
        assert!(
            matches!(&segments[3], Segment::FileReference { path, .. } if path == "./a.txt")
        );
        assert!(matches!(&segments[4], Segment::Text { content, .. } if content == "."));
    }

    #[test]
    fn reconstruction_is_exact() {
        let source = "Hello {{1+1}} world @./a.txt. And @b;type=text/plain, end";
        let segments = tokenize(source, 1);
        let mut rebuilt = String::new();
        for segment in &segments {
            match segment {
                Segment::Text { content, .. } => rebuilt.push_str(content),
                Segment::Expression { source, .. } => {
                    rebuilt.push_str("{{");
                    rebuilt.push_str(source);
                    rebuilt.push_str("}}");
                }
                Segment::FileReference { raw, .. } => rebuilt.push_str(raw),
                Segment::Thinking { .. } => {}
            }
        }
        assert_eq!(rebuilt, source);
    }

    #[test]
    fn percent_decoding() {
        assert_eq!(percent_decode("a%20b"), "a b");
        assert_eq!(percent_decode("%2Fetc"), "/etc");
        // Malformed escapes stay literal.
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz"), "%zz");
    }
}
