use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Static,
    Room,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
    pub kind: ChannelKind,
}

impl Channel {
    pub fn fixed(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            kind: ChannelKind::Static,
        }
    }
}

/// A dynamically created channel reachable via a short shareable code.
/// Codes are stored uppercase and compared case-insensitively; the channel
/// id is derived from the lowercased code so the mapping is deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub code: String,
    pub channel_id: String,
    pub name: String,
}

impl Room {
    pub fn from_code(code: &str) -> Self {
        let code = code.to_uppercase();
        Self {
            channel_id: format!("room-{}", code.to_lowercase()),
            name: format!("Pokój {}", code),
            code,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    User,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub channel_id: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Ids come from a single generator so no caller invents its own scheme
    /// (wall-clock ids collide across instances, UUIDs do not).
    fn next_id() -> String {
        Uuid::new_v4().to_string()
    }

    pub fn user(channel_id: &str, username: &str, content: &str) -> Self {
        Self {
            id: Self::next_id(),
            channel_id: channel_id.to_string(),
            kind: MessageKind::User,
            username: Some(username.to_string()),
            content: content.to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn system(channel_id: &str, content: &str) -> Self {
        Self {
            id: Self::next_id(),
            channel_id: channel_id.to_string(),
            kind: MessageKind::System,
            username: None,
            content: content.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Stored account record, keyed in the user directory by lowercased username.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub username: String,
    pub password_digest: String,
    pub created_at: DateTime<Utc>,
}
