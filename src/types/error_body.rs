use serde::{Deserialize, Serialize};

/// Error body returned by the agent backend on failure.
///
/// Both fields are optional; a body that fails to parse is treated as if it
/// were empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable description.
    #[serde(default)]
    pub error: Option<String>,

    /// Machine-readable error category, e.g. `insufficient_quota`.
    #[serde(default, rename = "type")]
    pub error_type: Option<String>,
}

impl ErrorBody {
    /// Parse an error body leniently.
    pub fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }
}
