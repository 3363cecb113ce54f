use serde::{Deserialize, Serialize};

use crate::types::AgentReply;

/// Request body for `POST /api/add_chat_message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddChatMessageRequest {
    /// The shared passphrase.
    pub passphrase: String,

    /// Host the conversation is about.
    pub hostname: String,

    /// Server-issued conversation token.
    #[serde(rename = "threadId")]
    pub thread_id: String,

    /// The human's turn.
    pub message: String,
}

/// Response body for `POST /api/add_chat_message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddChatMessageResponse {
    /// The agent's reply.
    pub message: AgentReply,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_uses_camel_case_thread_id() {
        let request = AddChatMessageRequest {
            passphrase: "secret1".to_string(),
            hostname: "a.example".to_string(),
            thread_id: "t1".to_string(),
            message: "I want shoes".to_string(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["threadId"], "t1");
        assert_eq!(json["hostname"], "a.example");
        assert!(json.get("thread_id").is_none());
    }
}
