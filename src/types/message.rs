use serde::{Deserialize, Serialize};

use crate::types::{AgentReply, Delivery, Origin};

/// One turn in a conversation.
///
/// The serialized form is the persisted snapshot layout:
/// `{from, content, mc_options?, status?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who produced the message.
    #[serde(rename = "from")]
    pub origin: Origin,

    /// The text shown and sent.
    pub content: String,

    /// Options offered for a multiple-choice reply (agent messages only).
    #[serde(
        rename = "mc_options",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub options: Option<Vec<String>>,

    /// Delivery state; only meaningful for human messages.
    #[serde(default, skip_serializing_if = "Delivery::is_delivered")]
    pub status: Delivery,

    /// Set once the option set of this message has been answered.
    #[serde(skip)]
    pub answered: bool,
}

impl Message {
    /// Create an agent message.
    pub fn agent(content: impl Into<String>, options: Option<Vec<String>>) -> Self {
        Self {
            origin: Origin::Agent,
            content: content.into(),
            options,
            status: Delivery::Delivered,
            answered: false,
        }
    }

    /// Create a human message that has reached the agent.
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            origin: Origin::Human,
            content: content.into(),
            options: None,
            status: Delivery::Delivered,
            answered: false,
        }
    }

    /// Create a human message whose exchange is still outstanding.
    pub fn pending(content: impl Into<String>) -> Self {
        Self {
            status: Delivery::Pending,
            ..Self::human(content)
        }
    }

    /// The options of this message, if it offers a non-empty choice.
    pub fn choices(&self) -> Option<&[String]> {
        match &self.options {
            Some(options) if !options.is_empty() => Some(options),
            _ => None,
        }
    }

    /// Returns true if this message offers a choice that is still unanswered.
    pub fn has_open_choice(&self) -> bool {
        self.origin.is_agent() && self.choices().is_some() && !self.answered
    }
}

impl From<AgentReply> for Message {
    fn from(reply: AgentReply) -> Self {
        Message::agent(reply.content, reply.mc_options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_layout() {
        let message = Message::agent("Size?", Some(vec!["8".to_string(), "9".to_string()]));
        let json = serde_json::to_string(&message).unwrap();
        assert_eq!(json, r#"{"from":"ai","content":"Size?","mc_options":["8","9"]}"#);

        let message = Message::human("9");
        let json = serde_json::to_string(&message).unwrap();
        assert_eq!(json, r#"{"from":"user","content":"9"}"#);
    }

    #[test]
    fn failed_status_is_persisted() {
        let mut message = Message::pending("9");
        message.status = Delivery::Failed;
        let json = serde_json::to_string(&message).unwrap();
        assert_eq!(json, r#"{"from":"user","content":"9","status":"failed"}"#);
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back, message);
    }

    #[test]
    fn empty_option_list_is_no_choice() {
        let message = Message::agent("Hi", Some(Vec::new()));
        assert!(message.choices().is_none());
        assert!(!message.has_open_choice());
    }

    #[test]
    fn from_agent_reply() {
        let message = Message::from(AgentReply::with_options("Size?", ["8", "9", "10"]));
        assert_eq!(message.origin, Origin::Agent);
        assert_eq!(message.choices().unwrap(), ["8", "9", "10"]);
        assert!(message.has_open_choice());
    }
}
