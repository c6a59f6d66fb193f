pub mod block;
pub mod command;
pub mod compiler;
pub mod env;
pub mod lifecycle;
pub mod parser;

pub use block::CodeBlock;
pub use command::Command;
pub use compiler::{SubstitutionContext, to_commands};
pub use env::{EnvLookup, ProcessEnv};
pub use lifecycle::Lifecycle;
pub use parser::{ParseError, ReadmeError, extract_code_blocks, extract_lifecycle, parse_readme};
