pub mod error;
pub mod state;

use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};

use gencord_store::Snapshot;
use gencord_types::models::{Channel, Message, Room};

pub use error::CoreError;
pub use state::{CoreState, LoginOutcome};

/// Shared handle over the core state. Every operation takes the lock once
/// and runs to completion inside it, then queues a snapshot for the
/// write-behind persistence task — callers never wait on disk.
#[derive(Clone)]
pub struct App {
    inner: Arc<AppInner>,
}

struct AppInner {
    state: RwLock<CoreState>,
    persist_tx: mpsc::UnboundedSender<Snapshot>,
}

impl App {
    pub fn new(snapshot: Snapshot, persist_tx: mpsc::UnboundedSender<Snapshot>) -> Self {
        Self {
            inner: Arc::new(AppInner {
                state: RwLock::new(CoreState::from_snapshot(snapshot)),
                persist_tx,
            }),
        }
    }

    fn persist(&self, state: &CoreState) {
        // The writer may already be gone during shutdown; the final flush
        // in main covers that window.
        let _ = self.inner.persist_tx.send(state.snapshot());
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.inner.state.read().await.snapshot()
    }

    pub async fn list_channels(&self) -> Vec<Channel> {
        self.inner.state.read().await.list_channels()
    }

    pub async fn list_rooms(&self) -> Vec<Room> {
        self.inner.state.read().await.list_rooms()
    }

    pub async fn create_room(&self) -> Room {
        let mut state = self.inner.state.write().await;
        let room = state.create_room();
        self.persist(&state);
        room
    }

    pub async fn join_room(&self, code: &str) -> Result<Room, CoreError> {
        let mut state = self.inner.state.write().await;
        let (room, recreated) = state.join_room(code)?;
        if recreated {
            self.persist(&state);
        }
        Ok(room)
    }

    pub async fn delete_channel(&self, channel_id: &str) -> Result<(), CoreError> {
        let mut state = self.inner.state.write().await;
        state.delete_channel(channel_id)?;
        self.persist(&state);
        Ok(())
    }

    pub async fn has_channel(&self, channel_id: &str) -> bool {
        self.inner.state.read().await.has_channel(channel_id)
    }

    pub async fn append_message(
        &self,
        channel_id: &str,
        username: &str,
        content: &str,
    ) -> Option<Message> {
        let mut state = self.inner.state.write().await;
        let message = state.append_message(channel_id, username, content)?;
        self.persist(&state);
        Some(message)
    }

    pub async fn history(&self, channel_id: &str) -> Result<Vec<Message>, CoreError> {
        self.inner.state.read().await.history(channel_id)
    }

    pub async fn login_or_register(
        &self,
        username: &str,
        password: &str,
    ) -> Result<LoginOutcome, CoreError> {
        let mut state = self.inner.state.write().await;
        let outcome = state.login_or_register(username, password)?;
        if outcome.created {
            self.persist(&state);
        }
        Ok(outcome)
    }
}
