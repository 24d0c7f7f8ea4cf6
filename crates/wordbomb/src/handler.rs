//! Per-connection handler: decode, route to lobby actors, relay broadcasts.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The loop waits on two things at once:
//!   1. Frames from the client → decode, validate, forward to the lobby
//!   2. Events from the watched lobby's broadcast group → encode, send
//!
//! A connection watches at most one lobby. Any lobby-scoped event
//! subscribes it to that lobby, replacing the previous subscription.
//! Closing the socket does not remove the player from a game; only
//! `leaveGame` does.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use wordbomb_lobby::{LobbyHandle, LobbyStore, WordOracle};
use wordbomb_protocol::{ClientEvent, Codec, LobbyId, ServerEvent};
use wordbomb_transport::{Connection, WebSocketConnection};

use crate::WordbombError;
use crate::server::ServerState;

/// The lobby a connection is currently watching.
struct Subscription {
    handle: LobbyHandle,
    events: broadcast::Receiver<ServerEvent>,
}

impl Subscription {
    fn lobby_id(&self) -> &LobbyId {
        self.handle.lobby_id()
    }

    /// Whether this subscription is live and for `handle`'s lobby.
    fn follows(&self, handle: &LobbyHandle) -> bool {
        self.lobby_id() == handle.lobby_id() && !self.handle.is_closed()
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<S, W>(
    conn: WebSocketConnection,
    state: Arc<ServerState<S, W>>,
) -> Result<(), WordbombError>
where
    S: LobbyStore,
    W: WordOracle,
{
    let conn_id = conn.id();
    tracing::debug!(%conn_id, peer = %conn.peer_addr(), "handling new connection");

    let mut watching: Option<Subscription> = None;

    loop {
        tokio::select! {
            frame = conn.recv() => {
                let data = match frame {
                    Ok(Some(data)) => data,
                    Ok(None) => {
                        tracing::info!(%conn_id, "connection closed cleanly");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(%conn_id, error = %e, "recv error");
                        break;
                    }
                };
                handle_frame(&conn, &state, &data, &mut watching).await?;
            }
            event = next_event(&mut watching) => {
                relay(&conn, &state, event, &mut watching).await?;
            }
        }
    }

    Ok(())
}

/// Decodes one client frame and routes it. Problems with the frame or the
/// lobby operation are reported back to this client only; only transport
/// failures end the connection.
async fn handle_frame<S, W>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<S, W>>,
    data: &[u8],
    watching: &mut Option<Subscription>,
) -> Result<(), WordbombError>
where
    S: LobbyStore,
    W: WordOracle,
{
    let event: ClientEvent = match state.codec.decode(data) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!(conn_id = %conn.id(), error = %e, "failed to decode event");
            return send_error(conn, state, 400, &e.to_string()).await;
        }
    };
    if let Err(e) = event.validate() {
        tracing::debug!(conn_id = %conn.id(), event = event.name(), error = %e, "invalid event");
        return send_error(conn, state, 400, &e.to_string()).await;
    }

    let handle = match state.lobbies.handle(event.lobby_id()).await {
        Ok(handle) => handle,
        Err(e) => {
            tracing::debug!(lobby_id = %event.lobby_id(), error = %e, "lobby lookup failed");
            return send_error(conn, state, e.code(), &e.to_string()).await;
        }
    };

    // Subscribe before dispatching so this client sees its own change.
    if !watching.as_ref().is_some_and(|sub| sub.follows(&handle)) {
        *watching = Some(Subscription {
            handle: handle.clone(),
            events: handle.subscribe(),
        });
    }

    tracing::trace!(conn_id = %conn.id(), event = event.name(), lobby_id = %handle.lobby_id(), "dispatching");
    match dispatch(conn, state, &handle, event).await {
        Ok(()) => Ok(()),
        Err(WordbombError::Lobby(e)) => {
            tracing::debug!(lobby_id = %handle.lobby_id(), error = %e, "lobby operation failed");
            send_error(conn, state, e.code(), &e.to_string()).await
        }
        Err(e) => Err(e),
    }
}

/// Forwards a decoded event to the lobby actor.
async fn dispatch<S, W>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<S, W>>,
    handle: &LobbyHandle,
    event: ClientEvent,
) -> Result<(), WordbombError>
where
    S: LobbyStore,
    W: WordOracle,
{
    match event {
        ClientEvent::WatchLobby { .. } => {
            let lobby = handle.snapshot().await?;
            send_event(conn, state, &ServerEvent::LobbyUpdated { lobby }).await?;
        }
        ClientEvent::JoinGame { player, .. } => {
            let username = player.username.clone();
            handle.join(player).await?;
            tracing::info!(lobby_id = %handle.lobby_id(), %username, "player joined");
        }
        ClientEvent::LeaveGame { username, .. } => {
            handle.leave(username.as_str()).await?;
            tracing::info!(lobby_id = %handle.lobby_id(), %username, "player left");
        }
        ClientEvent::StartGame { .. } => {
            handle.start().await?;
            tracing::info!(lobby_id = %handle.lobby_id(), "game started");
        }
        // Rejections are broadcast by the actor.
        ClientEvent::SendAnswer {
            username, answer, ..
        } => {
            handle.answer(username, answer).await?;
        }
        ClientEvent::ChangeAnswerField {
            username,
            draft_text,
            ..
        } => handle.draft(username, draft_text).await?,
        ClientEvent::SendMessage {
            username,
            message,
            avatar,
            ..
        } => handle.chat(username, message, avatar).await?,
    }
    Ok(())
}

/// Waits for the next broadcast on the watched lobby. Pends forever while
/// nothing is watched, so `select!` only serves the socket.
async fn next_event(watching: &mut Option<Subscription>) -> Result<ServerEvent, RecvError> {
    match watching {
        Some(sub) => sub.events.recv().await,
        None => std::future::pending().await,
    }
}

/// Sends one broadcast to the client, recovering from lag and from the
/// lobby's actor going away.
async fn relay<S, W>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<S, W>>,
    event: Result<ServerEvent, RecvError>,
    watching: &mut Option<Subscription>,
) -> Result<(), WordbombError>
where
    S: LobbyStore,
    W: WordOracle,
{
    match event {
        Ok(event) => send_event(conn, state, &event).await,
        Err(RecvError::Lagged(skipped)) => {
            let Some(sub) = watching.as_ref() else {
                return Ok(());
            };
            tracing::warn!(conn_id = %conn.id(), lobby_id = %sub.lobby_id(), skipped, "subscriber lagged, resending snapshot");
            match state.lobbies.snapshot(sub.lobby_id()).await {
                Ok(lobby) => send_event(conn, state, &ServerEvent::LobbyUpdated { lobby }).await,
                Err(e) => send_error(conn, state, e.code(), &e.to_string()).await,
            }
        }
        Err(RecvError::Closed) => {
            // The actor stopped. The next frame for this lobby restarts it
            // and subscribes again.
            if let Some(sub) = watching.take() {
                tracing::debug!(conn_id = %conn.id(), lobby_id = %sub.lobby_id(), "lobby broadcast closed");
            }
            Ok(())
        }
    }
}

async fn send_event<S, W>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<S, W>>,
    event: &ServerEvent,
) -> Result<(), WordbombError> {
    let bytes = state.codec.encode(event)?;
    let text = String::from_utf8_lossy(&bytes);
    conn.send_text(&text).await?;
    Ok(())
}

/// Sends an `error` event to this client only.
async fn send_error<S, W>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<S, W>>,
    code: u16,
    message: &str,
) -> Result<(), WordbombError> {
    let event = ServerEvent::Error {
        code,
        message: message.to_string(),
    };
    send_event(conn, state, &event).await
}
