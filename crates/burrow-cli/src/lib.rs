//! Command-line front end for the burrow folder registry.
//!
//! The binary is a thin shell over [`cli::run`]; keeping the command logic in
//! a library lets the integration tests drive it without spawning a process.

pub mod cli;
pub mod logging;

pub use cli::{run, Args, Command};
