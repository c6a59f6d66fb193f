//! Environment variable lookup used by `${NAME}` expansion.
//!
//! Compilation never reads the process environment directly; it goes through
//! an [`EnvLookup`] so callers and tests can supply their own mapping.

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

/// Read-only source of environment variable values.
pub trait EnvLookup {
    /// Value of the variable `name`, or `None` if it is unset.
    fn lookup(&self, name: &str) -> Option<String>;
}

/// Looks variables up in the current process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvLookup for ProcessEnv {
    fn lookup(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl<S: BuildHasher> EnvLookup for HashMap<String, String, S> {
    fn lookup(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl EnvLookup for BTreeMap<String, String> {
    fn lookup(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl<T: EnvLookup + ?Sized> EnvLookup for &T {
    fn lookup(&self, name: &str) -> Option<String> {
        (**self).lookup(name)
    }
}
