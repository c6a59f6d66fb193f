mod substitution;

pub use substitution::{DEPLOY_CLI, QUIET_FLAG, SubstitutionContext};

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::block::CodeBlock;
use crate::command::Command;
use crate::env::EnvLookup;
use crate::parser::ParseError;

/// Trailing marker joining a line to the next one.
pub const LINE_CONTINUATION: char = '\\';

static ENV_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid")
});

/// Compile one code block into its commands, one per logical line.
pub fn to_commands(block: &CodeBlock, ctx: &SubstitutionContext<'_>) -> Result<Vec<Command>, ParseError> {
    let logical = join_continuations(block)?;

    Ok(logical
        .iter()
        .filter_map(|line| {
            let expanded = expand_env(line, ctx.env());
            let tokens = expanded.split_whitespace().map(str::to_string).collect();
            Command::from_tokens(tokens)
        })
        .map(|command| substitution::apply(command, ctx))
        .collect())
}

/// Replace every `${NAME}` in `text` with its value; unset names expand to "".
pub fn expand_env<'t>(text: &'t str, env: &dyn EnvLookup) -> Cow<'t, str> {
    ENV_PLACEHOLDER.replace_all(text, |caps: &Captures<'_>| env.lookup(&caps[1]).unwrap_or_default())
}

/// Names of the `${NAME}` placeholders in `text` that would expand to "".
pub fn unset_placeholders<'t>(text: &'t str, env: &dyn EnvLookup) -> Vec<&'t str> {
    ENV_PLACEHOLDER
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|name| name.as_str())
        .filter(|name| env.lookup(name).is_none_or(|value| value.is_empty()))
        .collect()
}

/// Fold continued physical lines into logical lines.
///
/// A line continues only when `\` is its very last character; the marker is
/// dropped and the remaining text is joined to the next line as-is.
fn join_continuations(block: &CodeBlock) -> Result<Vec<String>, ParseError> {
    let mut logical = Vec::new();
    let mut pending: Option<String> = None;

    for line in &block.lines {
        let mut current = pending.take().unwrap_or_default();
        match line.strip_suffix(LINE_CONTINUATION) {
            Some(head) => {
                current.push_str(head);
                pending = Some(current);
            }
            None => {
                current.push_str(line);
                logical.push(current);
            }
        }
    }

    match (pending, block.last_line()) {
        (Some(_), Some(line)) => Err(ParseError::CodeBlockEndAfterLineCont { line }),
        _ => Ok(logical),
    }
}
