use super::*;
use crate::parser::parse;
use crate::parts::Part;
use std::collections::HashMap;
use std::fs;
use std::io;
use tempfile::TempDir;

/// In-memory resolver keyed by resolved path string.
#[derive(Default)]
struct MapResolver {
    files: HashMap<String, Vec<u8>>,
}

impl MapResolver {
    fn with(files: &[(&str, &str)]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(path, content)| (path.to_string(), content.as_bytes().to_vec()))
                .collect(),
        }
    }
}

impl ContentResolver for MapResolver {
    fn read(&self, path: &std::path::Path) -> io::Result<Vec<u8>> {
        self.files
            .get(&path.display().to_string())
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
    }

    fn mime_of(&self, _path: &std::path::Path) -> io::Result<String> {
        Ok("text/plain".to_string())
    }
}

fn evaluate_with(resolver: &dyn ContentResolver, source: &str, filename: &str) -> Evaluated {
    let registry = FrontmatterRegistry::new();
    let processor = Processor::new(resolver, &registry);
    let document = parse(source);
    let context = Context::from_source(filename);
    processor.evaluate(&document, &context)
}

fn text_of(parts: &[Part]) -> String {
    let mut out = String::new();
    for part in parts {
        if let Part::Text { text } = part {
            out.push_str(text);
        }
    }
    out
}

#[test]
fn user_message_evaluates_expressions_and_files() {
    let resolver = MapResolver::with(&[("a.txt", "hello A")]);
    let evaluated = evaluate_with(&resolver, "@You: Hello {{1+1}} world @./a.txt.", "chat.md");

    assert!(evaluated.diagnostics.is_empty());
    assert_eq!(evaluated.messages.len(), 1);
    assert_eq!(
        evaluated.messages[0].parts,
        vec![
            Part::Text {
                text: "Hello 2 world ".to_string(),
            },
            Part::File {
                path: "a.txt".to_string(),
                mime: "text/plain".to_string(),
                content: b"hello A".to_vec(),
            },
            Part::Text {
                text: ".".to_string(),
            },
        ]
    );
}

#[test]
fn failed_expression_keeps_literal_text_and_warns() {
    let resolver = MapResolver::default();
    let evaluated = evaluate_with(&resolver, "@You: {{ 1 / 'x' }}", "chat.md");

    assert_eq!(evaluated.diagnostics.len(), 1);
    let diagnostic = &evaluated.diagnostics[0];
    assert!(matches!(
        diagnostic.kind,
        DiagnosticKind::Expression { .. }
    ));
    assert_eq!(diagnostic.severity, Severity::Warning);
    assert!(diagnostic.message.contains("1 / 'x'"));

    // The original delimited expression survives in the output.
    let text = text_of(&evaluated.messages[0].parts);
    assert!(text.contains("{{ 1 / 'x' }}"));
}

#[test]
fn assistant_message_is_fully_literal() {
    let resolver = MapResolver::with(&[("a.txt", "never read")]);
    let evaluated = evaluate_with(&resolver, "@Assistant: {{ 1 + 1 }} and @./a.txt", "chat.md");

    assert!(evaluated.diagnostics.is_empty());
    assert_eq!(
        evaluated.messages[0].parts,
        vec![Part::Text {
            text: "{{ 1 + 1 }} and @./a.txt".to_string(),
        }]
    );
}

#[test]
fn system_round_trip_is_byte_exact() {
    let body = "keep {{ raw }} and @./f.bin;type=image/png! done";
    let resolver = MapResolver::default();
    let evaluated = evaluate_with(&resolver, &format!("@System: {}", body), "chat.md");

    assert_eq!(text_of(&evaluated.messages[0].parts), body);
    assert!(evaluated.diagnostics.is_empty());
}

#[test]
fn unreadable_reference_warns_once_per_reference() {
    let resolver = MapResolver::default();
    let evaluated = evaluate_with(&resolver, "@You: @./gone.txt and @./also.txt", "chat.md");

    assert_eq!(evaluated.diagnostics.len(), 2);
    for diagnostic in &evaluated.diagnostics {
        assert!(matches!(diagnostic.kind, DiagnosticKind::File { .. }));
        assert_eq!(diagnostic.severity, Severity::Warning);
    }
    // No file parts were produced.
    assert!(
        evaluated.messages[0]
            .parts
            .iter()
            .all(|p| matches!(p, Part::Text { .. }))
    );
}

#[test]
fn mime_override_wins_over_sniffing() {
    let resolver = MapResolver::with(&[("pic.bin", "bytes")]);
    let evaluated = evaluate_with(&resolver, "@You: @./pic.bin;type=image/png", "chat.md");

    assert_eq!(
        evaluated.messages[0].parts,
        vec![Part::File {
            path: "pic.bin".to_string(),
            mime: "image/png".to_string(),
            content: b"bytes".to_vec(),
        }]
    );
}

#[test]
fn context_variables_reach_expressions() {
    let resolver = MapResolver::default();
    let registry = FrontmatterRegistry::new();
    let processor = Processor::new(&resolver, &registry);
    let document = parse("@You: hello {{ name }}");
    let context = Context::from_source("chat.md").extend(
        [(
            "name".to_string(),
            Value::String("world".to_string()),
        )]
        .into(),
    );

    let evaluated = processor.evaluate(&document, &context);
    assert_eq!(text_of(&evaluated.messages[0].parts), "hello world");
}

#[test]
fn filename_variable_is_bound() {
    let resolver = MapResolver::default();
    let evaluated = evaluate_with(&resolver, "@You: in {{ __filename }}", "dir/chat.md");
    assert_eq!(text_of(&evaluated.messages[0].parts), "in dir/chat.md");
}

#[test]
fn thinking_passes_through_as_parts() {
    let resolver = MapResolver::default();
    let source = "@Assistant: before\n<think>\nreasoning\n</think>\nafter";
    let evaluated = evaluate_with(&resolver, source, "chat.md");

    assert_eq!(
        evaluated.messages[0].parts,
        vec![
            Part::Text {
                text: "before".to_string(),
            },
            Part::Thinking {
                text: "reasoning".to_string(),
            },
            Part::Text {
                text: "after".to_string(),
            },
        ]
    );
}

#[test]
fn evaluation_is_idempotent() {
    let resolver = MapResolver::with(&[("a.txt", "A")]);
    let registry = FrontmatterRegistry::new();
    let processor = Processor::new(&resolver, &registry);
    let document = parse("@You: {{ 1 + 2 }} @./a.txt {{ broken }}");
    let context = Context::from_source("chat.md");

    let first = processor.evaluate(&document, &context);
    let second = processor.evaluate(&document, &context);
    assert_eq!(first, second);
}

#[test]
fn evaluate_frontmatter_produces_bindings() {
    let resolver = MapResolver::default();
    let registry = FrontmatterRegistry::new();
    let processor = Processor::new(&resolver, &registry);
    let document = parse("```script\ngreeting = 'hi'\n```\n@You: {{ greeting }}");
    let context = Context::from_source("chat.md");

    let evaluated_fm = processor.evaluate_frontmatter(&document, &context).unwrap();
    assert_eq!(
        evaluated_fm.bindings().get("greeting"),
        Some(&Value::String("hi".to_string()))
    );

    let evaluated = processor.evaluate_with_frontmatter(&document, &context, &evaluated_fm);
    assert_eq!(text_of(&evaluated.messages[0].parts), "hi");
}

#[test]
fn evaluate_source_frontmatter_merges_context() {
    let resolver = MapResolver::default();
    let registry = FrontmatterRegistry::new();
    let processor = Processor::new(&resolver, &registry);

    let (context, evaluated_fm) = processor
        .evaluate_source_frontmatter("```json\n{\"n\": 5}\n```\n@You: x", "chat.md")
        .unwrap();
    assert_eq!(
        context.variables().get("n"),
        Some(&Value::Number(5.0))
    );
    assert_eq!(evaluated_fm.bindings().len(), 1);
}

#[test]
fn frontmatter_failure_is_fatal() {
    let resolver = MapResolver::default();
    let registry = FrontmatterRegistry::new();
    let processor = Processor::new(&resolver, &registry);
    let document = parse("```json\nnot json\n```\n@You: x");
    let context = Context::from_source("chat.md");

    assert!(processor.evaluate_frontmatter(&document, &context).is_err());
}

#[test]
fn include_splices_fragment_text() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("frag.md"), "from the fragment").unwrap();
    let chat = dir.path().join("chat.md");

    let evaluated = evaluate_with(
        &crate::resolver::FsResolver,
        "@You: start {{ include('./frag.md') }} end",
        &chat.display().to_string(),
    );

    assert!(evaluated.diagnostics.is_empty());
    assert_eq!(
        text_of(&evaluated.messages[0].parts),
        "start from the fragment end"
    );
}

#[test]
fn include_resolves_references_against_the_included_directory() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    fs::write(dir.path().join("sub/inner.txt"), "inner data").unwrap();
    fs::write(dir.path().join("sub/frag.md"), "has @./inner.txt here").unwrap();
    let chat = dir.path().join("chat.md");

    let evaluated = evaluate_with(
        &crate::resolver::FsResolver,
        "@You: {{ include('./sub/frag.md') }}",
        &chat.display().to_string(),
    );

    assert!(evaluated.diagnostics.is_empty());
    assert_eq!(
        text_of(&evaluated.messages[0].parts),
        "has inner data here"
    );
}

#[test]
fn include_evaluates_role_structured_documents() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("inner.md"),
        "@You: one {{ 2 * 2 }}\n@Assistant: two",
    )
    .unwrap();
    let chat = dir.path().join("chat.md");

    let evaluated = evaluate_with(
        &crate::resolver::FsResolver,
        "@You: {{ include('./inner.md') }}",
        &chat.display().to_string(),
    );

    assert_eq!(text_of(&evaluated.messages[0].parts), "one 4\ntwo");
}

#[test]
fn missing_include_is_contained() {
    let dir = TempDir::new().unwrap();
    let chat = dir.path().join("chat.md");

    let evaluated = evaluate_with(
        &crate::resolver::FsResolver,
        "@You: {{ include('./gone.md') }} after",
        &chat.display().to_string(),
    );

    assert_eq!(evaluated.diagnostics.len(), 1);
    let text = text_of(&evaluated.messages[0].parts);
    assert!(text.contains("{{ include('./gone.md') }}"));
    assert!(text.ends_with(" after"));
}

#[test]
fn mutual_includes_terminate_with_contained_fallback() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("a.md"),
        "A then {{ include('./b.md') }}",
    )
    .unwrap();
    fs::write(
        dir.path().join("b.md"),
        "B then {{ include('./a.md') }}",
    )
    .unwrap();
    let chat = dir.path().join("chat.md");

    // chat -> a -> b -> a is cut at the second visit of a.
    let evaluated = evaluate_with(
        &crate::resolver::FsResolver,
        "@You: {{ include('./a.md') }}",
        &chat.display().to_string(),
    );

    assert!(!evaluated.diagnostics.is_empty());
    let cycle = evaluated
        .diagnostics
        .iter()
        .any(|d| d.message.contains("circular include"));
    assert!(cycle, "expected a circular-include diagnostic");

    let text = text_of(&evaluated.messages[0].parts);
    assert!(text.starts_with("A then B then "));
    assert!(text.contains("{{ include('./a.md') }}"));
}

#[test]
fn self_include_is_contained() {
    let dir = TempDir::new().unwrap();
    let chat = dir.path().join("chat.md");
    fs::write(&chat, "unused on disk").unwrap();

    let evaluated = evaluate_with(
        &crate::resolver::FsResolver,
        "@You: {{ include('./chat.md') }}",
        &chat.display().to_string(),
    );

    assert_eq!(evaluated.diagnostics.len(), 1);
    assert!(evaluated.diagnostics[0].message.contains("circular include"));
}

#[test]
fn include_requires_a_string_argument() {
    let resolver = MapResolver::default();
    let evaluated = evaluate_with(&resolver, "@You: {{ include(42) }}", "chat.md");
    assert_eq!(evaluated.diagnostics.len(), 1);
    assert!(matches!(
        evaluated.diagnostics[0].kind,
        DiagnosticKind::Expression { .. }
    ));
}

#[test]
fn diagnostics_preserve_source_order() {
    let resolver = MapResolver::default();
    let evaluated = evaluate_with(
        &resolver,
        "@You: {{ bad1 }} then @./gone.txt then {{ bad2 }}",
        "chat.md",
    );

    assert_eq!(evaluated.diagnostics.len(), 3);
    assert!(matches!(
        &evaluated.diagnostics[0].kind,
        DiagnosticKind::Expression { source } if source.contains("bad1")
    ));
    assert!(matches!(
        &evaluated.diagnostics[1].kind,
        DiagnosticKind::File { .. }
    ));
    assert!(matches!(
        &evaluated.diagnostics[2].kind,
        DiagnosticKind::Expression { source } if source.contains("bad2")
    ));
}

#[test]
fn expression_diagnostics_carry_positions() {
    let resolver = MapResolver::default();
    let evaluated = evaluate_with(&resolver, "@You: first line\n{{ nope }}", "chat.md");
    assert_eq!(
        evaluated.diagnostics[0].position,
        Some(crate::ast::Position::line(2))
    );
}
