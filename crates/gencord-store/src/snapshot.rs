use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use gencord_types::models::{Message, Room, UserRecord};

/// The single persisted document: everything the server needs to survive a
/// restart, loaded wholesale at startup and rewritten wholesale by the
/// writer task. Room keys are uppercase codes, user keys lowercased names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Snapshot {
    pub messages_by_channel: HashMap<String, Vec<Message>>,
    pub rooms: HashMap<String, Room>,
    pub users: HashMap<String, UserRecord>,
}
