pub mod error;
mod scanner;

pub use error::{ParseError, ReadmeError};
pub use scanner::{DEFAULT_TAG, FENCE, Tag};

use std::path::Path;

use crate::block::CodeBlock;
use crate::compiler::SubstitutionContext;
use crate::lifecycle::{self, Lifecycle};

/// Parser entry point. Holds the code tag to look for.
#[derive(Debug, Clone, Default)]
pub struct Parser {
    tag: Tag,
}

impl Parser {
    pub fn new() -> Self {
        Parser::default()
    }

    /// Recognize `[//]: # ({payload})` instead of the default tag.
    pub fn with_tag(payload: &str) -> Self {
        Parser {
            tag: Tag::new(payload),
        }
    }

    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    /// Collect the tagged code blocks of a document, in document order.
    pub fn code_blocks<I, S>(&self, lines: I) -> Result<Vec<CodeBlock>, ParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        scanner::scan(lines, &self.tag)
    }

    /// Extract and compile every tagged code block into one lifecycle.
    pub fn lifecycle<I, S>(
        &self,
        lines: I,
        ctx: &SubstitutionContext<'_>,
    ) -> Result<Lifecycle, ParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let blocks = self.code_blocks(lines)?;
        lifecycle::assemble(&blocks, ctx)
    }

    /// Read a README from disk and extract its lifecycle.
    pub fn readme(
        &self,
        path: impl AsRef<Path>,
        ctx: &SubstitutionContext<'_>,
    ) -> Result<Lifecycle, ReadmeError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ReadmeError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self.lifecycle(source.lines(), ctx)?)
    }
}

/// Collect the code blocks tagged with the default tag.
pub fn extract_code_blocks<I, S>(lines: I) -> Result<Vec<CodeBlock>, ParseError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Parser::new().code_blocks(lines)
}

/// Extract the lifecycle of a document using the default tag.
pub fn extract_lifecycle<I, S>(lines: I, ctx: &SubstitutionContext<'_>) -> Result<Lifecycle, ParseError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Parser::new().lifecycle(lines, ctx)
}

/// Read the README at `path` and extract its lifecycle using the default tag.
pub fn parse_readme(
    path: impl AsRef<Path>,
    ctx: &SubstitutionContext<'_>,
) -> Result<Lifecycle, ReadmeError> {
    Parser::new().readme(path, ctx)
}
