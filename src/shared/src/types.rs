use serde::{Deserialize, Serialize};
use std::fmt;

// Common types
pub type UserId = String;
pub type ChannelId = String;
pub type MessageTs = String;
pub type CapabilityName = String;

/// Owned JSON object, the shape of capability arguments and normalized results.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// Kind of conversation a direct message or mention arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelKind {
    Direct,
    Shared,
}

impl ChannelKind {
    /// Slack direct-message channel ids start with `D`.
    pub fn of(channel_id: &str) -> Self {
        if channel_id.starts_with('D') {
            ChannelKind::Direct
        } else {
            ChannelKind::Shared
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelKind::Direct => write!(f, "direct"),
            ChannelKind::Shared => write!(f, "shared"),
        }
    }
}
