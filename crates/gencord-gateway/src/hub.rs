use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use gencord_types::events::ServerEvent;
use gencord_types::models::Message;

/// Tracks live connections and their text/voice memberships, and owns all
/// broadcast and relay fan-out.
///
/// All maps sit behind one lock, so each operation mutates membership and
/// delivers its events as a single uninterrupted turn — senders are
/// unbounded, nothing inside the lock ever waits.
#[derive(Clone)]
pub struct Hub {
    inner: Arc<RwLock<HubState>>,
}

#[derive(Default)]
struct HubState {
    connections: HashMap<Uuid, ConnectionEntry>,
    text_groups: HashMap<String, HashSet<Uuid>>,
    voice_groups: HashMap<String, HashSet<Uuid>>,
}

struct ConnectionEntry {
    tx: mpsc::UnboundedSender<ServerEvent>,
    username: Option<String>,
    text_channel: Option<String>,
    voice_channel: Option<String>,
}

impl HubState {
    fn send_to(&self, conn_id: Uuid, event: ServerEvent) {
        if let Some(entry) = self.connections.get(&conn_id) {
            let _ = entry.tx.send(event);
        }
    }

    fn broadcast(
        &self,
        group: Option<&HashSet<Uuid>>,
        event: ServerEvent,
        exclude: Option<Uuid>,
    ) {
        let Some(group) = group else { return };
        for &member in group {
            if Some(member) == exclude {
                continue;
            }
            self.send_to(member, event.clone());
        }
    }

    fn leave_text(&mut self, conn_id: Uuid, channel_id: &str, username: Option<&str>) {
        if let Some(group) = self.text_groups.get_mut(channel_id) {
            group.remove(&conn_id);
            if group.is_empty() {
                self.text_groups.remove(channel_id);
            }
        }
        if let Some(username) = username {
            self.broadcast(
                self.text_groups.get(channel_id),
                ServerEvent::SystemMessage(Message::system(
                    channel_id,
                    &format!("{username} opuścił kanał"),
                )),
                None,
            );
        }
    }

    fn leave_voice(&mut self, conn_id: Uuid, channel_id: &str) {
        if let Some(group) = self.voice_groups.get_mut(channel_id) {
            group.remove(&conn_id);
            if group.is_empty() {
                self.voice_groups.remove(channel_id);
            }
        }
        self.broadcast(
            self.voice_groups.get(channel_id),
            ServerEvent::VoiceUserLeft(conn_id),
            None,
        );
    }
}

impl Hub {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HubState::default())),
        }
    }

    /// Register a new connection. Returns its id and the event receiver the
    /// socket send loop drains.
    pub async fn register(&self) -> (Uuid, mpsc::UnboundedReceiver<ServerEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.write().await.connections.insert(
            conn_id,
            ConnectionEntry {
                tx,
                username: None,
                text_channel: None,
                voice_channel: None,
            },
        );
        (conn_id, rx)
    }

    /// Subscribe a connection to a text channel and announce it to the
    /// members already there. A connection holds at most one text
    /// subscription: joining elsewhere drops the previous one and tells its
    /// remaining members the user left.
    pub async fn join_channel(&self, conn_id: Uuid, channel_id: &str, username: &str) {
        let mut state = self.inner.write().await;

        let previous = {
            let Some(entry) = state.connections.get_mut(&conn_id) else {
                return;
            };
            if entry.text_channel.as_deref() == Some(channel_id) {
                return; // already a member
            }
            let prev_channel = entry.text_channel.replace(channel_id.to_string());
            let prev_username = entry.username.replace(username.to_string());
            prev_channel.map(|c| (c, prev_username))
        };

        if let Some((prev_channel, prev_username)) = previous {
            let name = prev_username.unwrap_or_else(|| username.to_string());
            state.leave_text(conn_id, &prev_channel, Some(&name));
        }

        state
            .text_groups
            .entry(channel_id.to_string())
            .or_default()
            .insert(conn_id);

        state.broadcast(
            state.text_groups.get(channel_id),
            ServerEvent::SystemMessage(Message::system(
                channel_id,
                &format!("{username} dołączył do kanału"),
            )),
            Some(conn_id),
        );
    }

    /// Deliver an accepted message to its whole text group, sender included.
    pub async fn broadcast_message(&self, message: Message) {
        let state = self.inner.read().await;
        let group = state.text_groups.get(&message.channel_id);
        state.broadcast(group, ServerEvent::MessageNew(message), None);
    }

    /// Join a voice group. Returns the occupants already present (excluding
    /// the joiner), or None when the join is a no-op because the connection
    /// is unknown or already in voice somewhere.
    pub async fn voice_join(&self, conn_id: Uuid, channel_id: &str) -> Option<Vec<Uuid>> {
        let mut state = self.inner.write().await;

        {
            let entry = state.connections.get_mut(&conn_id)?;
            if entry.voice_channel.is_some() {
                return None;
            }
            entry.voice_channel = Some(channel_id.to_string());
        }

        let group = state
            .voice_groups
            .entry(channel_id.to_string())
            .or_default();
        let others: Vec<Uuid> = group.iter().copied().collect();
        group.insert(conn_id);
        Some(others)
    }

    /// Leave the current voice group and notify remaining members.
    pub async fn voice_leave(&self, conn_id: Uuid) {
        let mut state = self.inner.write().await;
        let channel = match state.connections.get_mut(&conn_id) {
            Some(entry) => match entry.voice_channel.take() {
                Some(channel) => channel,
                None => return,
            },
            None => return,
        };
        state.leave_voice(conn_id, &channel);
    }

    /// Forward an opaque negotiation payload to the named connection,
    /// annotated with the sender. Missing targets and null payloads are
    /// dropped without telling the sender — delivery is best effort.
    pub async fn relay_signal(&self, from: Uuid, to: Uuid, data: serde_json::Value) {
        if data.is_null() {
            return;
        }
        let state = self.inner.read().await;
        state.send_to(to, ServerEvent::VoiceSignal { from, data });
    }

    /// Unicast an event to one connection.
    pub async fn send_to(&self, conn_id: Uuid, event: ServerEvent) {
        self.inner.read().await.send_to(conn_id, event);
    }

    /// The username recorded at channel:join time, if any.
    pub async fn username(&self, conn_id: Uuid) -> Option<String> {
        self.inner
            .read()
            .await
            .connections
            .get(&conn_id)
            .and_then(|entry| entry.username.clone())
    }

    /// Tear down a connection: leave broadcasts in both scopes, then drop
    /// the registry entry. Safe to call for an unknown id.
    pub async fn disconnect(&self, conn_id: Uuid) {
        let mut state = self.inner.write().await;
        let Some(entry) = state.connections.remove(&conn_id) else {
            return;
        };

        if let Some(channel) = entry.text_channel {
            state.leave_text(conn_id, &channel, entry.username.as_deref());
        }
        if let Some(channel) = entry.voice_channel {
            state.leave_voice(conn_id, &channel);
        }
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gencord_types::models::MessageKind;
    use tokio::sync::mpsc::error::TryRecvError;

    fn drain(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) {
        while rx.try_recv().is_ok() {}
    }

    #[tokio::test]
    async fn join_announcement_excludes_the_joiner() {
        let hub = Hub::new();
        let (a, mut a_rx) = hub.register().await;
        let (b, mut b_rx) = hub.register().await;

        hub.join_channel(a, "general", "ala").await;
        assert!(matches!(a_rx.try_recv(), Err(TryRecvError::Empty)));

        hub.join_channel(b, "general", "bartek").await;
        match a_rx.try_recv().unwrap() {
            ServerEvent::SystemMessage(msg) => {
                assert_eq!(msg.kind, MessageKind::System);
                assert_eq!(msg.content, "bartek dołączył do kanału");
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(matches!(b_rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn message_broadcast_includes_the_sender() {
        let hub = Hub::new();
        let (a, mut a_rx) = hub.register().await;
        let (b, mut b_rx) = hub.register().await;
        hub.join_channel(a, "general", "ala").await;
        hub.join_channel(b, "general", "bartek").await;
        drain(&mut a_rx);
        drain(&mut b_rx);

        hub.broadcast_message(Message::user("general", "ala", "hej")).await;

        for rx in [&mut a_rx, &mut b_rx] {
            match rx.try_recv().unwrap() {
                ServerEvent::MessageNew(msg) => assert_eq!(msg.content, "hej"),
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn rejoining_elsewhere_drops_the_old_subscription() {
        let hub = Hub::new();
        let (a, mut a_rx) = hub.register().await;
        let (b, mut b_rx) = hub.register().await;
        hub.join_channel(a, "general", "ala").await;
        hub.join_channel(b, "general", "bartek").await;
        drain(&mut a_rx);

        hub.join_channel(b, "games", "bartek").await;

        // a learns b left general.
        match a_rx.try_recv().unwrap() {
            ServerEvent::SystemMessage(msg) => {
                assert_eq!(msg.content, "bartek opuścił kanał");
            }
            other => panic!("unexpected event: {other:?}"),
        }

        // b no longer receives general traffic.
        drain(&mut b_rx);
        hub.broadcast_message(Message::user("general", "ala", "hej")).await;
        assert!(matches!(b_rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn voice_join_reports_existing_occupants() {
        let hub = Hub::new();
        let (a, _a_rx) = hub.register().await;
        let (b, mut b_rx) = hub.register().await;

        assert_eq!(hub.voice_join(a, "games").await, Some(vec![]));
        assert_eq!(hub.voice_join(b, "games").await, Some(vec![a]));

        // Second join anywhere is a no-op while still in voice.
        assert_eq!(hub.voice_join(b, "music").await, None);

        hub.relay_signal(a, b, serde_json::json!({"sdp": "offer"})).await;
        match b_rx.try_recv().unwrap() {
            ServerEvent::VoiceSignal { from, data } => {
                assert_eq!(from, a);
                assert_eq!(data["sdp"], "offer");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn signal_without_target_or_payload_is_dropped() {
        let hub = Hub::new();
        let (a, mut a_rx) = hub.register().await;

        hub.relay_signal(a, Uuid::new_v4(), serde_json::json!({"x": 1})).await;
        hub.relay_signal(a, a, serde_json::Value::Null).await;
        assert!(matches!(a_rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn voice_leave_notifies_remaining_members() {
        let hub = Hub::new();
        let (a, _a_rx) = hub.register().await;
        let (b, mut b_rx) = hub.register().await;
        hub.voice_join(a, "games").await;
        hub.voice_join(b, "games").await;

        hub.voice_leave(a).await;
        match b_rx.try_recv().unwrap() {
            ServerEvent::VoiceUserLeft(id) => assert_eq!(id, a),
            other => panic!("unexpected event: {other:?}"),
        }

        // Leaving again is a no-op.
        hub.voice_leave(a).await;
        assert!(matches!(b_rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn disconnect_broadcasts_in_both_scopes() {
        let hub = Hub::new();
        let (a, _a_rx) = hub.register().await;
        let (b, mut b_rx) = hub.register().await;
        hub.join_channel(a, "general", "ala").await;
        hub.join_channel(b, "general", "bartek").await;
        hub.voice_join(a, "general").await;
        hub.voice_join(b, "general").await;
        drain(&mut b_rx);

        hub.disconnect(a).await;

        let mut saw_left = false;
        let mut saw_voice_left = false;
        while let Ok(event) = b_rx.try_recv() {
            match event {
                ServerEvent::SystemMessage(msg) => {
                    assert_eq!(msg.content, "ala opuścił kanał");
                    saw_left = true;
                }
                ServerEvent::VoiceUserLeft(id) => {
                    assert_eq!(id, a);
                    saw_voice_left = true;
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }
        assert!(saw_left);
        assert!(saw_voice_left);
    }

    #[tokio::test]
    async fn sole_member_disconnect_sends_nothing_and_cleans_up() {
        let hub = Hub::new();
        let (a, mut a_rx) = hub.register().await;
        hub.join_channel(a, "general", "ala").await;
        hub.voice_join(a, "general").await;

        hub.disconnect(a).await;

        // The registry entry is gone, so the sender side is closed and
        // nothing was queued on the way out.
        assert!(matches!(a_rx.try_recv(), Err(TryRecvError::Disconnected)));
        assert!(hub.username(a).await.is_none());
    }
}
