//! Pull-based typed-chunk view of an evaluation.
//!
//! Provider-facing consumers scan resolved content as a flat sequence of
//! typed chunks instead of walking messages and parts. The iterator is
//! finite and restartable; each [`Evaluated::chunks`] call starts a fresh
//! pass with no cross-call state. Diagnostics are aggregated into a single
//! trailing [`Chunk::Warnings`]; the per-part diagnostic list on
//! [`Evaluated`] remains the one source of truth.

use crate::parts::Part;
use crate::processor::{Diagnostic, Evaluated};

/// One typed unit of scanned content.
#[derive(Debug, Clone, PartialEq)]
pub enum Chunk {
    Text {
        text: String,
    },
    File {
        path: String,
        mime: String,
        content: Vec<u8>,
    },
    /// All diagnostics of the evaluation, emitted once after the content.
    Warnings { diagnostics: Vec<Diagnostic> },
}

impl Evaluated {
    /// Iterate the evaluation's content as typed chunks. Thinking parts
    /// are not content and are skipped.
    pub fn chunks(&self) -> Chunks<'_> {
        Chunks {
            evaluated: self,
            message: 0,
            part: 0,
            warnings_emitted: false,
        }
    }
}

/// Iterator over [`Chunk`]s. See [`Evaluated::chunks`].
pub struct Chunks<'a> {
    evaluated: &'a Evaluated,
    message: usize,
    part: usize,
    warnings_emitted: bool,
}

impl Iterator for Chunks<'_> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        while self.message < self.evaluated.messages.len() {
            let parts = &self.evaluated.messages[self.message].parts;
            while self.part < parts.len() {
                let part = &parts[self.part];
                self.part += 1;
                match part {
                    Part::Text { text } => {
                        return Some(Chunk::Text { text: text.clone() });
                    }
                    Part::File {
                        path,
                        mime,
                        content,
                    } => {
                        return Some(Chunk::File {
                            path: path.clone(),
                            mime: mime.clone(),
                            content: content.clone(),
                        });
                    }
                    Part::Thinking { .. } => {}
                }
            }
            self.message += 1;
            self.part = 0;
        }

        if !self.warnings_emitted && !self.evaluated.diagnostics.is_empty() {
            self.warnings_emitted = true;
            return Some(Chunk::Warnings {
                diagnostics: self.evaluated.diagnostics.clone(),
            });
        }

        None
    }
}
