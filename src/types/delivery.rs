use serde::{Deserialize, Serialize};

/// Delivery state of a human message.
///
/// Human turns are appended before the agent has seen them. They start out
/// `Pending` and end up either `Delivered` (the agent replied) or `Failed`.
/// A failed turn stays in the history.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delivery {
    /// The exchange carrying this message completed.
    #[default]
    Delivered,

    /// The exchange carrying this message is still outstanding.
    Pending,

    /// The exchange carrying this message failed.
    Failed,
}

impl Delivery {
    /// Returns true when the message reached the agent.
    pub fn is_delivered(&self) -> bool {
        matches!(self, Delivery::Delivered)
    }

    /// Returns true while the message awaits its reply.
    pub fn is_pending(&self) -> bool {
        matches!(self, Delivery::Pending)
    }

    /// Returns true when the exchange carrying the message failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, Delivery::Failed)
    }
}
