//! Per-connection handler.
//!
//! Each accepted connection gets its own task running [`handle_connection`]:
//!   1. Register with the room registry (which sends the room list)
//!   2. Spawn a writer task draining the connection's event channel
//!   3. Loop: decode client actions and dispatch them
//!
//! Any rejection comes back to this connection alone as an `error-msg`
//! event. Malformed frames are answered the same way and the loop carries
//! on.

use std::sync::Arc;

use loto_protocol::{ClientAction, Codec, PlayerId, ServerEvent};
use loto_room::RoomRegistry;
use tokio::sync::mpsc;

use crate::ServerError;
use crate::server::ServerState;
use crate::transport::{ConnectionWriter, WebSocketConnection};

/// Leaves the registry when the handler exits, panics included. `Drop`
/// is synchronous, so the async cleanup runs in its own task.
struct SessionGuard {
    player_id: PlayerId,
    registry: Arc<RoomRegistry>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let player_id = self.player_id;
        let registry = Arc::clone(&self.registry);
        tokio::spawn(async move {
            registry.disconnect(player_id).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), ServerError> {
    let conn_id = conn.id();
    let peer = conn.peer_addr();
    let (writer, mut reader) = conn.split();

    let (tx, rx) = mpsc::unbounded_channel();
    let player_id = state.registry.connect(tx.clone()).await;
    let _guard = SessionGuard {
        player_id,
        registry: Arc::clone(&state.registry),
    };
    tracing::info!(%conn_id, %peer, player = %player_id, "client connected");

    let writer_task = tokio::spawn(write_events(writer, rx, Arc::clone(&state)));

    loop {
        let data = match reader.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(player = %player_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(player = %player_id, error = %e, "recv error");
                break;
            }
        };

        let action: ClientAction = match state.codec.decode(&data) {
            Ok(action) => action,
            Err(e) => {
                tracing::debug!(player = %player_id, error = %e, "failed to decode action");
                let _ = tx.send(ServerEvent::Error {
                    message: format!("invalid message: {e}"),
                });
                continue;
            }
        };

        let name = action.name();
        if let Err(e) = state.registry.dispatch(player_id, action).await {
            tracing::debug!(player = %player_id, action = name, error = %e, "action rejected");
            let _ = tx.send(ServerEvent::Error {
                message: e.to_string(),
            });
        }
    }

    writer_task.abort();
    // _guard drops here → registry disconnect fires.
    Ok(())
}

/// Encodes queued events and writes them as text frames until the channel
/// closes or the socket fails.
async fn write_events<C: Codec>(
    mut writer: ConnectionWriter,
    mut rx: mpsc::UnboundedReceiver<ServerEvent>,
    state: Arc<ServerState<C>>,
) {
    while let Some(event) = rx.recv().await {
        let text = match encode_text(&state.codec, &event) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "failed to encode event");
                continue;
            }
        };
        if let Err(e) = writer.send_text(text).await {
            tracing::debug!(error = %e, "write failed, stopping writer");
            break;
        }
    }
    let _ = writer.close().await;
}

fn encode_text<C: Codec>(codec: &C, event: &ServerEvent) -> Result<String, ServerError> {
    let bytes = codec.encode(event)?;
    String::from_utf8(bytes).map_err(|e| {
        ServerError::Protocol(loto_protocol::ProtocolError::InvalidMessage(format!(
            "codec produced non-UTF-8 output: {e}"
        )))
    })
}
