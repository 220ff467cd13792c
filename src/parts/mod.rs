//! Content parts: the evaluation-time output units.
//!
//! [`Part`] is what the processor produces per message: the internal,
//! provider-agnostic shape. [`GenericPart`] is the provider-neutral view
//! request builders consume, classified purely by MIME family via
//! [`to_generic_parts`].

use serde::Serialize;

/// A resolved unit of message content. Produced only by the processor,
/// never by the parser.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Part {
    /// Literal (or evaluated-and-spliced) text.
    Text { text: String },
    /// A resolved file attachment.
    File {
        /// The path the reference resolved to.
        path: String,
        /// MIME type: the `;type=` override when present, sniffed
        /// otherwise.
        mime: String,
        content: Vec<u8>,
    },
    /// A preserved thinking block.
    Thinking { text: String },
}

/// Provider-neutral part classification, keyed by MIME family.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GenericPart {
    Text {
        text: String,
    },
    Image {
        mime: String,
        content: Vec<u8>,
    },
    Pdf {
        content: Vec<u8>,
    },
    /// A textual attachment. Providers that inline rather than attach
    /// read the decoded `text` field.
    TextFile {
        path: String,
        mime: String,
        text: String,
    },
    Thinking {
        text: String,
    },
    /// Passthrough for file kinds no provider category matches.
    UnsupportedFile {
        path: String,
        mime: String,
        content: Vec<u8>,
    },
}

/// Classify internal parts into the provider-neutral shape. Total: no
/// I/O, no failure modes.
pub fn to_generic_parts(parts: &[Part]) -> Vec<GenericPart> {
    parts
        .iter()
        .map(|part| match part {
            Part::Text { text } => GenericPart::Text { text: text.clone() },
            Part::Thinking { text } => GenericPart::Thinking { text: text.clone() },
            Part::File {
                path,
                mime,
                content,
            } => {
                if mime.starts_with("image/") {
                    GenericPart::Image {
                        mime: mime.clone(),
                        content: content.clone(),
                    }
                } else if mime == "application/pdf" {
                    GenericPart::Pdf {
                        content: content.clone(),
                    }
                } else if mime.starts_with("text/") {
                    GenericPart::TextFile {
                        path: path.clone(),
                        mime: mime.clone(),
                        text: String::from_utf8_lossy(content).into_owned(),
                    }
                } else {
                    GenericPart::UnsupportedFile {
                        path: path.clone(),
                        mime: mime.clone(),
                        content: content.clone(),
                    }
                }
            }
        })
        .collect()
}
