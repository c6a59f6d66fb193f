use std::fmt;
use std::slice;

use crate::block::CodeBlock;
use crate::command::Command;
use crate::compiler::{SubstitutionContext, to_commands};
use crate::parser::ParseError;

/// The ordered commands extracted from a README.
/// Commands run in order; each must finish before the next one starts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lifecycle {
    commands: Vec<Command>,
}

impl Lifecycle {
    pub fn new(commands: Vec<Command>) -> Self {
        Lifecycle { commands }
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn iter(&self) -> slice::Iter<'_, Command> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl FromIterator<Command> for Lifecycle {
    fn from_iter<T: IntoIterator<Item = Command>>(iter: T) -> Self {
        Lifecycle::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Lifecycle {
    type Item = &'a Command;
    type IntoIter = slice::Iter<'a, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for Lifecycle {
    type Item = Command;
    type IntoIter = std::vec::IntoIter<Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.into_iter()
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for command in &self.commands {
            writeln!(f, "{}", command)?;
        }
        Ok(())
    }
}

/// Compile every block and concatenate the results in block order.
/// The first block that fails to compile aborts the whole lifecycle.
pub fn assemble(blocks: &[CodeBlock], ctx: &SubstitutionContext<'_>) -> Result<Lifecycle, ParseError> {
    let mut commands = Vec::new();
    for block in blocks {
        commands.extend(to_commands(block, ctx)?);
    }
    Ok(Lifecycle::new(commands))
}
