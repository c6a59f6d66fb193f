/// The literal lines of one tagged, fenced code block.
/// Lines are stored verbatim, without the fence markers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CodeBlock {
    /// Raw lines in document order.
    pub lines: Vec<String>,
    /// 0-based document line index of the first content line.
    pub start_line: usize,
}

impl CodeBlock {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CodeBlock {
            lines: lines.into_iter().map(Into::into).collect(),
            start_line: 0,
        }
    }

    pub fn starting_at(mut self, start_line: usize) -> Self {
        self.start_line = start_line;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Document line index of the last content line, if any.
    pub fn last_line(&self) -> Option<usize> {
        self.lines.len().checked_sub(1).map(|n| self.start_line + n)
    }
}
