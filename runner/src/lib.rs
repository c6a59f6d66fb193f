pub mod error;
pub mod executor;

pub use error::ExecError;
pub use executor::{Execute, Executor, execute_lifecycle};
