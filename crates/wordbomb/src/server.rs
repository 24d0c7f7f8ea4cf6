//! `WordbombServer` builder and server loops.
//!
//! This is the entry point for running the game server. It ties the
//! layers together: transport → protocol → lobby actors, plus the HTTP
//! snapshot API on its own listener.

use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use wordbomb_lobby::{LobbyConfig, LobbyError, LobbyManager, LobbyStore, WordOracle, seed_public_lobby};
use wordbomb_protocol::JsonCodec;
use wordbomb_transport::{Transport, WebSocketTransport};

use crate::WordbombError;
use crate::handler::handle_connection;

/// Shared server state passed to each connection task and HTTP handler.
///
/// Built once by [`WordbombServerBuilder::build`] and wrapped in `Arc`.
/// The lobby manager does its own locking.
pub(crate) struct ServerState<S, W> {
    pub(crate) lobbies: LobbyManager<S, W>,
    pub(crate) codec: JsonCodec,
}

/// Listener addresses and lobby settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Where the WebSocket endpoint listens.
    pub ws_addr: String,
    /// Where the HTTP snapshot API listens.
    pub http_addr: String,
    pub lobby: LobbyConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ws_addr: "127.0.0.1:8080".to_string(),
            http_addr: "127.0.0.1:8081".to_string(),
            lobby: LobbyConfig::default(),
        }
    }
}

/// Builder for configuring and starting a word bomb server.
///
/// # Example
///
/// ```rust,ignore
/// use wordbomb::prelude::*;
///
/// let words = WordList::new().with_dictionary("english", "cart\nstar\n");
/// let server = WordbombServer::builder()
///     .ws_addr("0.0.0.0:8080")
///     .http_addr("0.0.0.0:8081")
///     .build(MemoryLobbyStore::new(), words)
///     .await?;
/// server.run().await
/// ```
pub struct WordbombServerBuilder {
    config: ServerConfig,
}

impl WordbombServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Sets the WebSocket bind address.
    pub fn ws_addr(mut self, addr: &str) -> Self {
        self.config.ws_addr = addr.to_string();
        self
    }

    /// Sets the HTTP bind address.
    pub fn http_addr(mut self, addr: &str) -> Self {
        self.config.http_addr = addr.to_string();
        self
    }

    /// Sets the settings every lobby actor runs with.
    pub fn lobby_config(mut self, config: LobbyConfig) -> Self {
        self.config.lobby = config;
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Seeds the store, binds both listeners and returns the server.
    ///
    /// If the store holds no lobbies yet, the public lobby is created.
    pub async fn build<S: LobbyStore, W: WordOracle>(
        self,
        store: S,
        oracle: W,
    ) -> Result<WordbombServer<S, W>, WordbombError> {
        let ServerConfig {
            ws_addr,
            http_addr,
            lobby,
        } = self.config;

        seed_public_lobby(&store, &lobby.default_dictionary)
            .await
            .map_err(LobbyError::from)?;

        let transport = WebSocketTransport::bind(&ws_addr).await?;
        let http = TcpListener::bind(&http_addr).await?;

        let state = Arc::new(ServerState {
            lobbies: LobbyManager::new(Arc::new(store), Arc::new(oracle), lobby),
            codec: JsonCodec,
        });

        Ok(WordbombServer {
            transport,
            http,
            state,
        })
    }
}

impl Default for WordbombServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound word bomb server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct WordbombServer<S, W> {
    transport: WebSocketTransport,
    http: TcpListener,
    state: Arc<ServerState<S, W>>,
}

impl<S: LobbyStore, W: WordOracle> WordbombServer<S, W> {
    /// Creates a new builder.
    pub fn builder() -> WordbombServerBuilder {
        WordbombServerBuilder::new()
    }

    /// The address the WebSocket endpoint is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, WordbombError> {
        Ok(self.transport.local_addr()?)
    }

    /// The address the HTTP API is bound to.
    pub fn http_addr(&self) -> Result<SocketAddr, WordbombError> {
        Ok(self.http.local_addr()?)
    }

    /// Runs the WebSocket accept loop and the HTTP API until the process
    /// is terminated or the HTTP server fails.
    pub async fn run(self) -> Result<(), WordbombError> {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Like [`run`](Self::run), but stops once `shutdown` resolves. Every
    /// lobby actor is stopped on the way out.
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) -> Result<(), WordbombError> {
        let Self {
            transport,
            http,
            state,
        } = self;

        tracing::info!(
            ws_addr = ?transport.local_addr().ok(),
            http_addr = ?http.local_addr().ok(),
            "word bomb server running"
        );

        let api = axum::serve(http, crate::http::router(Arc::clone(&state))).into_future();
        let result = tokio::select! {
            res = api => res.map_err(WordbombError::from),
            () = accept_loop(transport, Arc::clone(&state)) => Ok(()),
            () = shutdown => {
                tracing::info!("shutdown requested");
                Ok(())
            }
        };

        state.lobbies.shutdown().await;
        result
    }
}

/// Accepts connections forever, spawning a handler task for each.
async fn accept_loop<S: LobbyStore, W: WordOracle>(
    mut transport: WebSocketTransport,
    state: Arc<ServerState<S, W>>,
) {
    loop {
        match transport.accept().await {
            Ok(conn) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(conn, state).await {
                        tracing::debug!(error = %e, "connection ended with error");
                    }
                });
            }
            Err(e) => {
                tracing::error!(error = %e, "accept failed");
            }
        }
    }
}
