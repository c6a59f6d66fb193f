use crate::block::CodeBlock;
use crate::parser::error::ParseError;

/// Payload of the code tag recognized when none is configured.
pub const DEFAULT_TAG: &str = "sst-run-unix";

/// Line that opens and closes a code block.
pub const FENCE: &str = "```";

/// A hidden Markdown comment marking the next fenced block as executable:
/// `[//]: # ({payload})`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    line: String,
}

impl Tag {
    pub fn new(payload: &str) -> Self {
        Tag {
            line: format!("[//]: # ({{{}}})", payload),
        }
    }

    /// The exact line this tag matches.
    pub fn line(&self) -> &str {
        &self.line
    }

    pub fn matches(&self, line: &str) -> bool {
        line == self.line
    }
}

impl Default for Tag {
    fn default() -> Self {
        Tag::new(DEFAULT_TAG)
    }
}

// ---------------------------------------------------------------------------
// Scan state
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum ScanState {
    /// Ordinary Markdown; only a tag line changes state.
    Prose,
    /// A tag was seen; the next line must be a fence.
    AwaitingFence { tag_line: usize },
    /// Inside a tagged fence, collecting lines.
    InBlock { open_line: usize, lines: Vec<String> },
}

impl ScanState {
    fn advance(
        self,
        tag: &Tag,
        index: usize,
        line: &str,
        blocks: &mut Vec<CodeBlock>,
    ) -> Result<ScanState, ParseError> {
        match self {
            ScanState::Prose if tag.matches(line) => Ok(ScanState::AwaitingFence { tag_line: index }),
            ScanState::Prose => Ok(ScanState::Prose),
            ScanState::AwaitingFence { .. } if line == FENCE => Ok(ScanState::InBlock {
                open_line: index,
                lines: Vec::new(),
            }),
            ScanState::AwaitingFence { .. } => Err(ParseError::CodeBlockStartNotFound { line: index }),
            ScanState::InBlock { open_line, lines } if line == FENCE => {
                blocks.push(CodeBlock::new(lines).starting_at(open_line + 1));
                Ok(ScanState::Prose)
            }
            ScanState::InBlock { open_line, mut lines } => {
                lines.push(line.to_string());
                Ok(ScanState::InBlock { open_line, lines })
            }
        }
    }

    fn finish(self) -> Result<(), ParseError> {
        match self {
            ScanState::Prose => Ok(()),
            ScanState::AwaitingFence { tag_line } => Err(ParseError::EofAfterCodeTag { line: tag_line }),
            ScanState::InBlock { open_line, .. } => Err(ParseError::CodeBlockNotClosed { line: open_line }),
        }
    }
}

/// Scan `lines` once, front to back, collecting every tagged code block.
pub(crate) fn scan<I, S>(lines: I, tag: &Tag) -> Result<Vec<CodeBlock>, ParseError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut blocks = Vec::new();
    let mut state = ScanState::Prose;

    for (index, line) in lines.into_iter().enumerate() {
        state = state.advance(tag, index, line.as_ref(), &mut blocks)?;
    }

    state.finish()?;
    Ok(blocks)
}
