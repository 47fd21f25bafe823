//! wmictl library surface, split out so integration tests can exercise
//! the command layer without spawning the binary.

pub mod cli;
pub mod commands;
pub mod errors;
pub mod output;
