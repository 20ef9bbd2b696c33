//! Subprocess transport for the chat backend
//!
//! Spawns the backend in its line-oriented API mode and exchanges one JSON
//! line per request and per response over its stdin/stdout.

pub mod cli;
pub mod process;

pub use cli::CliTransport;
pub use process::{ProcessConfig, ProcessHandle};
