//! Transport abstraction layer for the word bomb server.
//!
//! Provides the [`Transport`] and [`Connection`] traits so the server
//! never touches a concrete socket type, plus a WebSocket implementation.
//! Browser clients speak JSON, so connections expose text frames as a
//! first-class operation next to raw bytes.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-unique number of an accepted connection, used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Hands out the next id. Ids start at 1 and never repeat.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// A listener that yields client connections.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next client and completes its handshake.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// The address the transport is listening on.
    fn local_addr(&self) -> Result<SocketAddr, Self::Error>;
}

/// A single bidirectional connection.
///
/// `send*` and `recv` may be driven from different tasks at the same time:
/// a connection handler typically waits on `recv` while lobby events are
/// pushed out through `send_text`.
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    /// Sends a UTF-8 text frame.
    async fn send_text(&self, text: &str) -> Result<(), Self::Error>;

    /// Sends raw bytes. Valid UTF-8 goes out as a text frame, anything
    /// else as a binary frame.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        match std::str::from_utf8(data) {
            Ok(text) => self.send_text(text).await,
            Err(_) => self.send_binary(data).await,
        }
    }

    /// Sends a binary frame.
    async fn send_binary(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Waits for the next text or binary frame. Control frames are
    /// skipped. `Ok(None)` means the peer closed the socket.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Sends a close frame.
    async fn close(&self) -> Result<(), Self::Error>;

    fn id(&self) -> ConnectionId;

    /// The remote peer's address.
    fn peer_addr(&self) -> SocketAddr;
}
