//! Text command surface.
//!
//! Commands are looked up by their first token and receive the whole token list, so a
//! command can tell `pause` from `pause on`. Results are plain strings meant for a console;
//! user mistakes come back as [`CommandError`] and never change emulator state.

mod controller;
mod hotkey;

use thiserror::Error;

pub use controller::CommandController;
pub use hotkey::{HostKey, HotKeys};

pub type Result<T> = std::result::Result<T, CommandError>;

/// A console command.
pub trait Command {
    /// Runs the command. `tokens[0]` is the command name.
    fn execute(&self, tokens: &[&str]) -> Result<String>;

    /// Help text, one line per entry.
    fn help(&self) -> &'static [&'static str];
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Syntax error")]
    Syntax,

    #[error("Illegal argument")]
    IllegalArgument,

    #[error("Unknown command: {0}")]
    Unknown(String),

    #[error("command {0} is already registered")]
    AlreadyRegistered(String),
}
