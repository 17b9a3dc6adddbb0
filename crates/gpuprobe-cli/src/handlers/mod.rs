//! Command handlers.
//!
//! Thin wrappers: build what the command needs from the composition root,
//! call the core service, format the output for the terminal.

pub mod query;
pub mod serve;
