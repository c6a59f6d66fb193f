use std::ops::Range;
use std::path::PathBuf;

use codespan_reporting::diagnostic::{Diagnostic, Label};
use thiserror::Error;

/// Malformed tag / fence / continuation structure in a README.
/// Each variant carries the 0-based document line it refers to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A code tag was the last line of the input.
    #[error("unexpected end of input after code tag on line {}", .line + 1)]
    EofAfterCodeTag { line: usize },

    /// The line after a code tag is not a code fence.
    #[error("expected code block start (```) after code tag, found line {}", .line + 1)]
    CodeBlockStartNotFound { line: usize },

    /// A code fence was opened but never closed.
    #[error("code block opened on line {} is not closed", .line + 1)]
    CodeBlockNotClosed { line: usize },

    /// The last line of a code block ends with a line continuation.
    #[error("code block ends after line continuation on line {}", .line + 1)]
    CodeBlockEndAfterLineCont { line: usize },
}

impl ParseError {
    /// Stable identifier of the error kind.
    pub fn name(&self) -> &'static str {
        match self {
            ParseError::EofAfterCodeTag { .. } => "EOFAfterCodeTag",
            ParseError::CodeBlockStartNotFound { .. } => "CodeBlockStartNotFound",
            ParseError::CodeBlockNotClosed { .. } => "CodeBlockNotClosed",
            ParseError::CodeBlockEndAfterLineCont { .. } => "CodeBlockEndAfterLineCont",
        }
    }

    /// 0-based document line the error points at.
    pub fn line(&self) -> usize {
        match self {
            ParseError::EofAfterCodeTag { line }
            | ParseError::CodeBlockStartNotFound { line }
            | ParseError::CodeBlockNotClosed { line }
            | ParseError::CodeBlockEndAfterLineCont { line } => *line,
        }
    }

    fn note(&self) -> &'static str {
        match self {
            ParseError::EofAfterCodeTag { .. } | ParseError::CodeBlockStartNotFound { .. } => {
                "a code tag must be immediately followed by a line containing only ```"
            }
            ParseError::CodeBlockNotClosed { .. } => "close the block with a line containing only ```",
            ParseError::CodeBlockEndAfterLineCont { .. } => {
                "the last line of a code block cannot end with \\"
            }
        }
    }

    /// Convert to a codespan-reporting Diagnostic for display.
    /// `span` is the byte range of [`ParseError::line`] in the file `file_id`.
    pub fn to_diagnostic(&self, file_id: usize, span: Range<usize>) -> Diagnostic<usize> {
        Diagnostic::error()
            .with_code(self.name())
            .with_message(self.to_string())
            .with_labels(vec![Label::primary(file_id, span)])
            .with_notes(vec![self.note().to_string()])
    }
}

/// Failure to turn a README file into a lifecycle.
#[derive(Debug, Error)]
pub enum ReadmeError {
    #[error("cannot read '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),
}
