// Public modules
pub mod add_chat_message;
pub mod agent_reply;
pub mod delivery;
pub mod error_body;
pub mod heartbeat;
pub mod message;
pub mod origin;
pub mod start_chat;

// Re-exports
pub use add_chat_message::{AddChatMessageRequest, AddChatMessageResponse};
pub use agent_reply::AgentReply;
pub use delivery::Delivery;
pub use error_body::ErrorBody;
pub use heartbeat::Heartbeat;
pub use message::Message;
pub use origin::Origin;
pub use start_chat::{StartChatRequest, StartChatResponse};
