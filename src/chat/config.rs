//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and configuration
//! structures for controlling chat behavior.

use std::time::Duration;

use arrrg_derive::CommandLine;

/// Default directory for persisted state.
pub const DEFAULT_STATE_DIR: &str = ".clerk";

/// Default per-request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u32 = 60;

/// Command-line arguments for the clerk-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Base URL of the agent backend.
    #[arrrg(
        optional,
        "Agent backend URL (default: $CLERK_BACKEND_URL or http://localhost:5555)",
        "URL"
    )]
    pub backend_url: Option<String>,

    /// Passphrase to begin the session with.
    #[arrrg(optional, "Passphrase (prompted for when absent)", "PASSPHRASE")]
    pub passphrase: Option<String>,

    /// Site to begin the session about.
    #[arrrg(optional, "Site URL to chat about (prompted for when absent)", "URL")]
    pub url: Option<String>,

    /// Directory the session snapshot is kept in.
    #[arrrg(optional, "Directory for persisted state (default: .clerk)", "DIR")]
    pub state_dir: Option<String>,

    /// Per-request timeout.
    #[arrrg(optional, "Request timeout in seconds (default: 60)", "SECONDS")]
    pub timeout_secs: Option<u32>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Agent backend URL; `None` defers to the environment and then the default.
    pub backend_url: Option<String>,

    /// Passphrase used instead of prompting.
    pub passphrase: Option<String>,

    /// Site URL used instead of prompting.
    pub url: Option<String>,

    /// Directory the session snapshot is kept in.
    pub state_dir: String,

    /// Per-request timeout.
    pub timeout: Duration,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Backend: from the environment
    /// - State directory: .clerk
    /// - Timeout: 60 seconds
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            backend_url: None,
            passphrase: None,
            url: None,
            state_dir: DEFAULT_STATE_DIR.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS.into()),
            use_color: true,
        }
    }

    /// Sets the backend URL.
    pub fn with_backend_url(mut self, url: impl Into<String>) -> Self {
        self.backend_url = Some(url.into());
        self
    }

    /// Sets the passphrase.
    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(passphrase.into());
        self
    }

    /// Sets the site URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the state directory.
    pub fn with_state_dir(mut self, dir: impl Into<String>) -> Self {
        self.state_dir = dir.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        let defaults = ChatConfig::new();
        ChatConfig {
            backend_url: args.backend_url,
            passphrase: args.passphrase,
            url: args.url,
            state_dir: args.state_dir.unwrap_or(defaults.state_dir),
            timeout: args
                .timeout_secs
                .map(|secs| Duration::from_secs(secs.into()))
                .unwrap_or(defaults.timeout),
            use_color: !args.no_color,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ChatConfig::new();
        assert!(config.backend_url.is_none());
        assert!(config.passphrase.is_none());
        assert!(config.url.is_none());
        assert_eq!(config.state_dir, ".clerk");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert!(config.use_color);
    }

    #[test]
    fn config_from_args_defaults() {
        let config = ChatConfig::from(ChatArgs::default());
        assert_eq!(config, ChatConfig::new());
    }

    #[test]
    fn config_from_args_custom() {
        let args = ChatArgs {
            backend_url: Some("https://agent.example".to_string()),
            passphrase: Some("secret1".to_string()),
            url: Some("https://a.example/shop".to_string()),
            state_dir: Some("/tmp/clerk".to_string()),
            timeout_secs: Some(5),
            no_color: true,
        };
        let config = ChatConfig::from(args);
        assert_eq!(config.backend_url.as_deref(), Some("https://agent.example"));
        assert_eq!(config.passphrase.as_deref(), Some("secret1"));
        assert_eq!(config.url.as_deref(), Some("https://a.example/shop"));
        assert_eq!(config.state_dir, "/tmp/clerk");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(!config.use_color);
    }

    #[test]
    fn config_builder_pattern() {
        let config = ChatConfig::new()
            .with_backend_url("https://agent.example")
            .with_passphrase("secret1")
            .with_url("https://a.example")
            .with_state_dir("state")
            .with_timeout(Duration::from_secs(10))
            .without_color();
        assert_eq!(config.backend_url.as_deref(), Some("https://agent.example"));
        assert_eq!(config.passphrase.as_deref(), Some("secret1"));
        assert_eq!(config.url.as_deref(), Some("https://a.example"));
        assert_eq!(config.state_dir, "state");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert!(!config.use_color);
    }
}
