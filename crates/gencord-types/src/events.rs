use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Message;

/// Commands sent FROM client TO server over the WebSocket.
///
/// The wire envelope is `{"type": "...", "data": {...}}`, with the event
/// names the desktop client already speaks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientCommand {
    /// Enter a text channel. Ignored server-side when the channel is unknown.
    #[serde(rename = "channel:join", rename_all = "camelCase")]
    ChannelJoin { channel_id: String, username: String },

    /// Post a message to a channel. The username is optional; the server
    /// falls back to the name recorded at channel:join time.
    #[serde(rename = "message:send", rename_all = "camelCase")]
    MessageSend {
        channel_id: String,
        content: String,
        #[serde(default)]
        username: Option<String>,
    },

    /// Join the per-channel voice group.
    #[serde(rename = "voice:join", rename_all = "camelCase")]
    VoiceJoin { channel_id: String },

    /// Relay an opaque peer-negotiation payload to another connection.
    #[serde(rename = "voice:signal")]
    VoiceSignal { to: Uuid, data: serde_json::Value },

    /// Leave the current voice group.
    #[serde(rename = "voice:leave")]
    VoiceLeave,
}

/// Events sent FROM server TO clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerEvent {
    /// A user message accepted into a channel's log.
    #[serde(rename = "message:new")]
    MessageNew(Message),

    /// Presence notice (joined / left). Broadcast-only, never logged.
    #[serde(rename = "system:message")]
    SystemMessage(Message),

    /// Reply to voice:join — the occupants already in the voice group,
    /// excluding the requester.
    #[serde(rename = "voice:users")]
    VoiceUsers(Vec<Uuid>),

    /// Relayed negotiation payload, annotated with the sender's id.
    #[serde(rename = "voice:signal")]
    VoiceSignal { from: Uuid, data: serde_json::Value },

    /// A connection left the voice group.
    #[serde(rename = "voice:user-left")]
    VoiceUserLeft(Uuid),
}
