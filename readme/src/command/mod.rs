use std::fmt;

/// A single external command invocation: an executable name and its arguments.
/// Two commands are equal when their name and argument vector are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Command {
    name: String,
    args: Vec<String>,
}

impl Command {
    pub fn new<I, S>(name: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Command {
            name: name.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Build a command from a token vector. Returns `None` for an empty vector.
    pub fn from_tokens(mut tokens: Vec<String>) -> Option<Self> {
        if tokens.is_empty() {
            return None;
        }
        let name = tokens.remove(0);
        Some(Command { name, args: tokens })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub(crate) fn into_parts(self) -> (String, Vec<String>) {
        (self.name, self.args)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}
