use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use gencord_core::App;
use gencord_types::events::{ClientCommand, ServerEvent};

use crate::hub::Hub;

/// Drive a single WebSocket connection: register with the hub, pump hub
/// events out and client commands in, and run disconnect cleanup when
/// either direction ends.
pub async fn handle_socket(socket: WebSocket, hub: Hub, app: App) {
    let (mut sender, mut receiver) = socket.split();

    let (conn_id, mut events_rx) = hub.register().await;
    info!("connection {} opened", conn_id);

    // Forward hub events -> client.
    let mut send_task = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            let text = serde_json::to_string(&event).unwrap();
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // Read commands from client.
    let hub_recv = hub.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<ClientCommand>(&text) {
                    Ok(cmd) => handle_command(&hub_recv, &app, conn_id, cmd).await,
                    Err(e) => {
                        warn!(
                            "connection {} bad command: {} -- raw: {}",
                            conn_id,
                            e,
                            log_preview(&text)
                        );
                    }
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    hub.disconnect(conn_id).await;
    info!("connection {} closed", conn_id);
}

/// Truncate on char boundaries — malformed frames can carry multi-byte
/// text, and a byte-offset slice would panic mid-character.
fn log_preview(text: &str) -> String {
    text.chars().take(200).collect()
}

async fn handle_command(hub: &Hub, app: &App, conn_id: Uuid, cmd: ClientCommand) {
    match cmd {
        ClientCommand::ChannelJoin { channel_id, username } => {
            // Unknown channels are ignored, not answered.
            if !app.has_channel(&channel_id).await {
                debug!("{} tried to join unknown channel {}", conn_id, channel_id);
                return;
            }
            info!("{} joins channel {} as {}", conn_id, channel_id, username);
            hub.join_channel(conn_id, &channel_id, &username).await;
        }

        ClientCommand::MessageSend {
            channel_id,
            content,
            username,
        } => {
            let username = match username {
                Some(name) if !name.trim().is_empty() => name,
                _ => hub
                    .username(conn_id)
                    .await
                    .unwrap_or_else(|| "Anon".to_string()),
            };
            // append_message rejects unknown channels and blank content.
            let Some(message) = app.append_message(&channel_id, &username, &content).await
            else {
                return;
            };
            hub.broadcast_message(message).await;
        }

        ClientCommand::VoiceJoin { channel_id } => {
            if !app.has_channel(&channel_id).await {
                return;
            }
            if let Some(occupants) = hub.voice_join(conn_id, &channel_id).await {
                info!("{} joins voice for {}", conn_id, channel_id);
                hub.send_to(conn_id, ServerEvent::VoiceUsers(occupants)).await;
            }
        }

        ClientCommand::VoiceSignal { to, data } => {
            hub.relay_signal(conn_id, to, data).await;
        }

        ClientCommand::VoiceLeave => {
            hub.voice_leave(conn_id).await;
        }
    }
}
