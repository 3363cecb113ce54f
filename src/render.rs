//! Terminal rendering for the conversation.
//!
//! This module provides the renderer trait the REPL writes through and a
//! plain-text implementation with optional ANSI styling.

use std::io::{self, Stdout, Write};

use crate::classify::AttachedError;
use crate::session::Session;
use crate::types::{Delivery, Message, Origin};

/// ANSI escape code for dim text (used for closed option sets).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for the agent label).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for yellow text (used for open options).
const ANSI_YELLOW: &str = "\x1b[33m";

/// ANSI escape code for green text (used for the human label).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for errors and undelivered turns).
const ANSI_RED: &str = "\x1b[31m";

/// Trait for rendering conversation output.
pub trait Renderer: Send {
    /// Print one message of the conversation.
    ///
    /// `selectable` says whether the message's options can be picked now.
    fn print_message(&mut self, message: &Message, selectable: bool);

    /// Print an error attached by the orchestrator.
    fn print_attached(&mut self, error: &AttachedError) {
        self.print_error(&error.to_string());
    }

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Print the whole conversation.
    fn print_history(&mut self, session: &Session, selectable: Option<usize>) {
        for (index, message) in session.messages().iter().enumerate() {
            self.print_message(message, selectable == Some(index));
        }
    }
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
        }
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.use_color {
            format!("{color}{text}{ANSI_RESET}")
        } else {
            text.to_string()
        }
    }

    /// Formats a message the way [`Renderer::print_message`] prints it.
    pub fn format_message(&self, message: &Message, selectable: bool) -> String {
        let mut out = match message.origin {
            Origin::Agent => format!("{} {}\n", self.paint(ANSI_CYAN, "agent>"), message.content),
            Origin::Human => {
                let marker = match message.status {
                    Delivery::Delivered => String::new(),
                    Delivery::Pending => format!(" {}", self.paint(ANSI_DIM, "(awaiting reply)")),
                    Delivery::Failed => format!(" {}", self.paint(ANSI_RED, "(not delivered)")),
                };
                format!(
                    "{} {}{marker}\n",
                    self.paint(ANSI_GREEN, "you>"),
                    message.content
                )
            }
        };
        if let Some(choices) = message.choices() {
            for (index, choice) in choices.iter().enumerate() {
                let line = if selectable {
                    format!("  [{}] {choice}", index + 1)
                } else {
                    format!("   {}. {choice}", index + 1)
                };
                let color = if selectable { ANSI_YELLOW } else { ANSI_DIM };
                out.push_str(&self.paint(color, &line));
                out.push('\n');
            }
        }
        out
    }

    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn print_message(&mut self, message: &Message, selectable: bool) {
        let text = self.format_message(message, selectable);
        print!("{text}");
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        eprintln!("{}", self.paint(ANSI_RED, &format!("Error: {error}")));
    }

    fn print_info(&mut self, info: &str) {
        println!("{info}");
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renderer_default_has_color() {
        let renderer = PlainTextRenderer::new();
        assert!(renderer.use_color);
    }

    #[test]
    fn renderer_without_color() {
        let renderer = PlainTextRenderer::with_color(false);
        assert!(!renderer.use_color);
    }

    #[test]
    fn open_options_are_numbered_from_one() {
        let renderer = PlainTextRenderer::with_color(false);
        let message = Message::agent(
            "Size?",
            Some(vec!["8".to_string(), "9".to_string(), "10".to_string()]),
        );
        assert_eq!(
            renderer.format_message(&message, true),
            "agent> Size?\n  [1] 8\n  [2] 9\n  [3] 10\n"
        );
        assert_eq!(
            renderer.format_message(&message, false),
            "agent> Size?\n   1. 8\n   2. 9\n   3. 10\n"
        );
    }

    #[test]
    fn human_turns_show_delivery() {
        let renderer = PlainTextRenderer::with_color(false);
        assert_eq!(
            renderer.format_message(&Message::human("9"), false),
            "you> 9\n"
        );
        let mut failed = Message::pending("9");
        assert_eq!(
            renderer.format_message(&failed, false),
            "you> 9 (awaiting reply)\n"
        );
        failed.status = Delivery::Failed;
        assert_eq!(
            renderer.format_message(&failed, false),
            "you> 9 (not delivered)\n"
        );
    }

    #[test]
    fn color_wraps_labels() {
        let renderer = PlainTextRenderer::with_color(true);
        let text = renderer.format_message(&Message::agent("Hi", None), false);
        assert!(text.starts_with(ANSI_CYAN));
        assert!(text.contains(ANSI_RESET));
    }
}
