use serde::{Deserialize, Serialize};

/// Response body for `GET /api/heartbeat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heartbeat {
    /// The server's clock, as the server formats it.
    pub server_time: String,
}
