use serde::{Deserialize, Serialize};

use crate::types::AgentReply;

/// Request body for `POST /api/start_chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartChatRequest {
    /// The site the agent should learn about.
    pub url: String,

    /// The shared passphrase.
    pub passphrase: String,
}

impl StartChatRequest {
    /// Create a new start-chat request.
    pub fn new(url: impl Into<String>, passphrase: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            passphrase: passphrase.into(),
        }
    }
}

/// Response body for `POST /api/start_chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartChatResponse {
    /// Opaque token naming the conversation on the server.
    pub thread_id: String,

    /// The agent's greeting.
    pub message: AgentReply,
}
