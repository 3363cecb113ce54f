use serde::{Deserialize, Serialize};

/// A message as the agent backend sends it over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentReply {
    /// The text of the reply.
    pub content: String,

    /// Options offered for a multiple-choice answer, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mc_options: Option<Vec<String>>,
}

impl AgentReply {
    /// Create a plain-text reply.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            mc_options: None,
        }
    }

    /// Create a reply offering the given options.
    pub fn with_options<S: Into<String>>(
        content: impl Into<String>,
        options: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            content: content.into(),
            mc_options: Some(options.into_iter().map(Into::into).collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_are_optional() {
        let reply: AgentReply = serde_json::from_str(r#"{"content":"Hi"}"#).unwrap();
        assert_eq!(reply, AgentReply::new("Hi"));
        assert_eq!(serde_json::to_string(&reply).unwrap(), r#"{"content":"Hi"}"#);
    }

    #[test]
    fn options_keep_their_order() {
        let reply: AgentReply =
            serde_json::from_str(r#"{"content":"Size?","mc_options":["8","9","10"]}"#).unwrap();
        assert_eq!(reply, AgentReply::with_options("Size?", ["8", "9", "10"]));
    }
}
