//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to control the chat session without sending messages
//! to the agent.

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Answer the open option set with the option at this 1-based position.
    Pick(usize),

    /// Discard the conversation and start a new one.
    New,

    /// Reprint the conversation.
    History,

    /// Display session status (host, message count, pending exchange).
    Status,

    /// Check that the agent backend is reachable.
    Ping,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a valid command,
/// or `None` if it should be treated as a regular message.
///
/// # Examples
///
/// ```
/// # use clerk::chat::{ChatCommand, parse_command};
/// assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
/// assert_eq!(parse_command("/pick 2"), Some(ChatCommand::Pick(2)));
/// assert!(parse_command("I want shoes").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    if !input.starts_with('/') {
        return None;
    }

    let mut parts = input[1..].splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "pick" | "p" => parse_pick(argument),
        "new" | "reset" => ChatCommand::New,
        "history" => ChatCommand::History,
        "status" | "stats" => ChatCommand::Status,
        "ping" => ChatCommand::Ping,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        _ => ChatCommand::Invalid(format!("Unknown command: /{command}")),
    };

    Some(result)
}

fn parse_pick(argument: Option<&str>) -> ChatCommand {
    match argument {
        Some(arg) => match arg.parse::<usize>() {
            Ok(value) if value >= 1 => ChatCommand::Pick(value),
            _ => ChatCommand::Invalid("/pick expects a positive option number".to_string()),
        },
        None => ChatCommand::Invalid("/pick requires an option number".to_string()),
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /pick <n>              Answer the agent's options with option n
  /new                   Discard this conversation and start another
  /history               Reprint the conversation
  /status                Show session status
  /ping                  Check that the agent backend is reachable
  /help                  Show this help message
  /quit                  Exit the chat
Anything else is sent to the agent. Ctrl+C abandons a pending reply."#
}
