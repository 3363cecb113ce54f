use serde::{Deserialize, Serialize};
use std::fmt;

/// Who produced a message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Origin {
    /// The remote agent.
    #[serde(rename = "ai")]
    Agent,

    /// The person typing into the client.
    #[serde(rename = "user")]
    Human,
}

impl Origin {
    /// Returns true for agent-produced messages.
    pub fn is_agent(self) -> bool {
        matches!(self, Origin::Agent)
    }

    /// Returns true for human-produced messages.
    pub fn is_human(self) -> bool {
        matches!(self, Origin::Human)
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Agent => write!(f, "ai"),
            Origin::Human => write!(f, "user"),
        }
    }
}
