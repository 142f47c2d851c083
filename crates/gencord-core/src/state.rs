use std::collections::{HashMap, VecDeque};

use chrono::Utc;
use rand::Rng;
use rand::distr::Alphanumeric;
use sha2::{Digest, Sha256};
use tracing::debug;

use gencord_store::Snapshot;
use gencord_types::models::{Channel, Message, Room, UserRecord};

use crate::error::CoreError;

/// Channels that always exist, in declaration order.
const STATIC_CHANNELS: [&str; 3] = ["general", "games", "music"];

/// Retained messages per channel; older entries are evicted first.
const LOG_CAP: usize = 100;

const ROOM_CODE_LEN: usize = 6;

/// All mutable server state in one place: static channels, code-addressed
/// rooms, per-channel bounded logs, and the user directory. Owned by a
/// single lock upstream, so every method runs as one uninterrupted turn.
pub struct CoreState {
    channels: Vec<Channel>,
    rooms: HashMap<String, Room>,
    logs: HashMap<String, VecDeque<Message>>,
    users: HashMap<String, UserRecord>,
}

/// Result of login_or_register: the canonical display name plus whether
/// this call created the account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub username: String,
    pub created: bool,
}

impl CoreState {
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let channels: Vec<Channel> =
            STATIC_CHANNELS.iter().map(|id| Channel::fixed(id)).collect();

        let mut logs: HashMap<String, VecDeque<Message>> = HashMap::new();
        let mut restore_log = |channel_id: &str,
                               messages: &mut HashMap<String, Vec<Message>>| {
            let restored = messages.remove(channel_id).unwrap_or_default();
            logs.insert(channel_id.to_string(), VecDeque::from(restored));
        };

        let mut messages = snapshot.messages_by_channel;
        for channel in &channels {
            restore_log(&channel.id, &mut messages);
        }
        for room in snapshot.rooms.values() {
            restore_log(&room.channel_id, &mut messages);
        }
        // Logs for channels that no longer exist are dropped here.
        if !messages.is_empty() {
            debug!("dropped {} orphaned channel logs", messages.len());
        }

        Self {
            channels,
            rooms: snapshot.rooms,
            logs,
            users: snapshot.users,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            messages_by_channel: self
                .logs
                .iter()
                .map(|(id, log)| (id.clone(), log.iter().cloned().collect()))
                .collect(),
            rooms: self.rooms.clone(),
            users: self.users.clone(),
        }
    }

    // -- Channel & room registry --

    /// Static channels only; rooms are never broadly advertised.
    pub fn list_channels(&self) -> Vec<Channel> {
        self.channels.clone()
    }

    pub fn list_rooms(&self) -> Vec<Room> {
        let mut rooms: Vec<Room> = self.rooms.values().cloned().collect();
        rooms.sort_by(|a, b| a.code.cmp(&b.code));
        rooms
    }

    pub fn create_room(&mut self) -> Room {
        let code = loop {
            let candidate: String = rand::rng()
                .sample_iter(&Alphanumeric)
                .take(ROOM_CODE_LEN)
                .map(char::from)
                .collect::<String>()
                .to_uppercase();
            if !self.rooms.contains_key(&candidate) {
                break candidate;
            }
        };

        let room = Room::from_code(&code);
        self.logs.insert(room.channel_id.clone(), VecDeque::new());
        self.rooms.insert(room.code.clone(), room.clone());
        room
    }

    /// The bool reports whether a missing log had to be recreated, so the
    /// caller persists only when this lookup actually mutated state.
    pub fn join_room(&mut self, code: &str) -> Result<(Room, bool), CoreError> {
        let key = code.trim().to_uppercase();
        let room = self
            .rooms
            .get(&key)
            .cloned()
            .ok_or_else(|| CoreError::NotFound("Pokój nie istnieje".into()))?;

        // A room without a log should not happen, but recreate it rather
        // than letting later joins and appends fail.
        let recreated = !self.logs.contains_key(&room.channel_id);
        self.logs.entry(room.channel_id.clone()).or_default();

        Ok((room, recreated))
    }

    pub fn delete_channel(&mut self, channel_id: &str) -> Result<(), CoreError> {
        if self.channels.iter().any(|c| c.id == channel_id) {
            return Err(CoreError::InvalidRequest(
                "Nie można usunąć kanału stałego".into(),
            ));
        }

        // Reverse lookup: the room owning this channel, if it still exists.
        let code = self
            .rooms
            .values()
            .find(|room| room.channel_id == channel_id)
            .map(|room| room.code.clone());
        if let Some(code) = code {
            self.rooms.remove(&code);
        }
        self.logs.remove(channel_id);
        Ok(())
    }

    pub fn has_channel(&self, channel_id: &str) -> bool {
        self.logs.contains_key(channel_id)
    }

    // -- Message log --

    /// Append a user message. Returns None (a deliberate no-op) for an
    /// unknown channel or content that is empty after trimming.
    pub fn append_message(
        &mut self,
        channel_id: &str,
        username: &str,
        content: &str,
    ) -> Option<Message> {
        let content = content.trim();
        if content.is_empty() {
            return None;
        }
        let log = self.logs.get_mut(channel_id)?;

        let message = Message::user(channel_id, username, content);
        log.push_back(message.clone());
        while log.len() > LOG_CAP {
            log.pop_front();
        }
        Some(message)
    }

    pub fn history(&self, channel_id: &str) -> Result<Vec<Message>, CoreError> {
        self.logs
            .get(channel_id)
            .map(|log| log.iter().cloned().collect())
            .ok_or_else(|| CoreError::NotFound("Kanał nie istnieje".into()))
    }

    // -- User directory --

    /// First caller for a name claims it; afterwards the same credentials
    /// log in and anything else is rejected.
    pub fn login_or_register(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<LoginOutcome, CoreError> {
        let username = username.trim();
        let password = password.trim();
        if username.is_empty() || password.is_empty() {
            return Err(CoreError::InvalidRequest(
                "Podaj nazwę użytkownika i hasło".into(),
            ));
        }

        let key = username.to_lowercase();
        let digest = password_digest(password);

        match self.users.get(&key) {
            Some(record) => {
                if record.password_digest != digest {
                    return Err(CoreError::Unauthorized);
                }
                Ok(LoginOutcome {
                    username: record.username.clone(),
                    created: false,
                })
            }
            None => {
                self.users.insert(
                    key,
                    UserRecord {
                        username: username.to_string(),
                        password_digest: digest,
                        created_at: Utc::now(),
                    },
                );
                Ok(LoginOutcome {
                    username: username.to_string(),
                    created: true,
                })
            }
        }
    }
}

fn password_digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_state() -> CoreState {
        CoreState::from_snapshot(Snapshot::default())
    }

    #[test]
    fn static_channels_listed_in_declaration_order() {
        let state = empty_state();
        let ids: Vec<String> =
            state.list_channels().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, ["general", "games", "music"]);
    }

    #[test]
    fn log_caps_at_100_and_evicts_oldest_first() {
        let mut state = empty_state();
        for i in 0..105 {
            assert!(
                state
                    .append_message("general", "ala", &format!("msg {i}"))
                    .is_some()
            );
        }

        let history = state.history("general").unwrap();
        assert_eq!(history.len(), 100);
        assert_eq!(history.first().unwrap().content, "msg 5");
        assert_eq!(history.last().unwrap().content, "msg 104");
    }

    #[test]
    fn append_is_noop_for_unknown_channel_or_blank_content() {
        let mut state = empty_state();
        assert!(state.append_message("nope", "ala", "hej").is_none());
        assert!(state.append_message("general", "ala", "   ").is_none());
        assert!(state.history("general").unwrap().is_empty());
    }

    #[test]
    fn history_of_unknown_channel_is_not_found() {
        let state = empty_state();
        assert!(matches!(
            state.history("nope"),
            Err(CoreError::NotFound(_))
        ));
    }

    #[test]
    fn room_codes_join_case_insensitively() {
        let mut state = empty_state();
        let room = state.create_room();

        let (joined, recreated) = state.join_room(&room.code.to_lowercase()).unwrap();
        assert_eq!(joined.channel_id, room.channel_id);
        assert_eq!(joined.name, format!("Pokój {}", room.code));
        assert!(!recreated);
    }

    #[test]
    fn created_rooms_never_collide() {
        let mut state = empty_state();
        let mut codes = std::collections::HashSet::new();
        for _ in 0..50 {
            let room = state.create_room();
            assert!(codes.insert(room.code.clone()));
            assert!(state.has_channel(&room.channel_id));
        }
    }

    #[test]
    fn join_unknown_room_is_not_found() {
        let mut state = empty_state();
        assert!(matches!(
            state.join_room("ZZZZZZ"),
            Err(CoreError::NotFound(_))
        ));
    }

    #[test]
    fn join_room_recreates_missing_log() {
        let mut state = empty_state();
        let room = state.create_room();
        state.logs.remove(&room.channel_id);

        let (_, recreated) = state.join_room(&room.code).unwrap();
        assert!(recreated);
        assert!(state.has_channel(&room.channel_id));
    }

    #[test]
    fn deleting_static_channel_is_invalid() {
        let mut state = empty_state();
        assert!(matches!(
            state.delete_channel("general"),
            Err(CoreError::InvalidRequest(_))
        ));
        assert!(state.has_channel("general"));
    }

    #[test]
    fn deleting_room_removes_entry_and_log() {
        let mut state = empty_state();
        let room = state.create_room();

        state.delete_channel(&room.channel_id).unwrap();
        assert!(!state.has_channel(&room.channel_id));
        assert!(matches!(
            state.join_room(&room.code),
            Err(CoreError::NotFound(_))
        ));

        // Idempotent on re-delete.
        state.delete_channel(&room.channel_id).unwrap();
    }

    #[test]
    fn login_claims_then_logs_in_idempotently() {
        let mut state = empty_state();

        let first = state.login_or_register("Basia", "sekret").unwrap();
        assert!(first.created);
        assert_eq!(first.username, "Basia");

        let again = state.login_or_register("BASIA", "sekret").unwrap();
        assert!(!again.created);
        assert_eq!(again.username, "Basia");
    }

    #[test]
    fn login_rejects_wrong_password() {
        let mut state = empty_state();
        state.login_or_register("Basia", "sekret").unwrap();
        assert_eq!(
            state.login_or_register("basia", "zle-haslo"),
            Err(CoreError::Unauthorized)
        );
    }

    #[test]
    fn login_rejects_blank_credentials() {
        let mut state = empty_state();
        assert!(matches!(
            state.login_or_register("  ", "x"),
            Err(CoreError::InvalidRequest(_))
        ));
        assert!(matches!(
            state.login_or_register("ala", ""),
            Err(CoreError::InvalidRequest(_))
        ));
    }

    #[test]
    fn snapshot_round_trip_preserves_rooms_logs_and_users() {
        let mut state = empty_state();
        let room = state.create_room();
        state.append_message("general", "ala", "hej").unwrap();
        state.append_message(&room.channel_id, "ala", "w pokoju").unwrap();
        state.login_or_register("Ala", "haslo").unwrap();

        let mut restored = CoreState::from_snapshot(state.snapshot());
        assert_eq!(restored.history("general").unwrap().len(), 1);
        assert_eq!(restored.history(&room.channel_id).unwrap().len(), 1);
        assert_eq!(restored.join_room(&room.code).unwrap().0.code, room.code);
        assert!(!restored.users.is_empty());
    }

    #[test]
    fn orphaned_logs_are_dropped_on_restore() {
        let mut snapshot = Snapshot::default();
        snapshot
            .messages_by_channel
            .insert("room-gone".into(), vec![Message::user("room-gone", "x", "y")]);

        let state = CoreState::from_snapshot(snapshot);
        assert!(!state.has_channel("room-gone"));
    }
}
