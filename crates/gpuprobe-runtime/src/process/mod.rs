//! Child process execution for vendor tools.

mod runner;
mod shutdown;

pub use runner::TokioCommandRunner;
pub use shutdown::terminate_child;
