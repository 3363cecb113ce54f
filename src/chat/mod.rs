//! Chat application module for interactive conversations with the agent.
//!
//! This module provides the pieces of the `clerk-chat` REPL that are worth
//! testing apart from the terminal:
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`commands`]: Slash command parsing

mod commands;
mod config;

pub use crate::render::{PlainTextRenderer, Renderer};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig, DEFAULT_STATE_DIR};
