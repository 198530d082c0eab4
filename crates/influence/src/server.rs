//! `InfluenceServer` builder and server loop.
//!
//! This is the entry point for running the stream server. It ties
//! together all the layers: backend → stores → service → hub → transport.

use std::net::SocketAddr;
use std::sync::Arc;

use influence_broadcast::{BroadcastHub, HubConfig};
use influence_room::{ActionRegistry, RoomConfig, RoomStateStore, StoreConfig};
use influence_session::{JoinCodeRegistry, SessionConfig, SessionRegistry};
use influence_store::KeyValueBackend;
use influence_transport::{Incoming, Transport, WebSocketConnection, WebSocketTransport};

use crate::handler::{handle_connection, ConnectionConfig};
use crate::service::GameService;
use crate::InfluenceError;

/// Builder for configuring and starting an Influence server.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use influence::prelude::*;
///
/// # async fn run() -> Result<(), InfluenceError> {
/// let server = InfluenceServer::builder()
///     .bind("0.0.0.0:8080")
///     .build(Arc::new(MemoryBackend::new()))
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct InfluenceServerBuilder {
    bind_addr: String,
    session_config: SessionConfig,
    store_config: StoreConfig,
    room_config: RoomConfig,
    hub_config: HubConfig,
    connection_config: ConnectionConfig,
    actions: ActionRegistry,
}

impl InfluenceServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            session_config: SessionConfig::default(),
            store_config: StoreConfig::default(),
            room_config: RoomConfig::default(),
            hub_config: HubConfig::default(),
            connection_config: ConnectionConfig::default(),
            actions: ActionRegistry::default(),
        }
    }

    /// Sets the address to bind the server to. Port `0` lets the OS pick.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the join code and session token configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Sets the room TTL, mutation deadline, and retry policy.
    pub fn store_config(mut self, config: StoreConfig) -> Self {
        self.store_config = config;
        self
    }

    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    pub fn hub_config(mut self, config: HubConfig) -> Self {
        self.hub_config = config;
        self
    }

    pub fn connection_config(mut self, config: ConnectionConfig) -> Self {
        self.connection_config = config;
        self
    }

    /// Replaces the action handlers.
    pub fn actions(mut self, actions: ActionRegistry) -> Self {
        self.actions = actions;
        self
    }

    /// Binds the listener and wires every component onto `backend`.
    pub async fn build<B: KeyValueBackend>(
        self,
        backend: Arc<B>,
    ) -> Result<InfluenceServer<B>, InfluenceError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let hub = Arc::new(BroadcastHub::new(self.hub_config));
        let service = GameService::new(
            RoomStateStore::new(Arc::clone(&backend), self.store_config),
            JoinCodeRegistry::new(Arc::clone(&backend), self.session_config.clone()),
            SessionRegistry::new(backend, self.session_config),
            hub,
        )
        .with_room_config(self.room_config)
        .with_actions(self.actions);

        Ok(InfluenceServer {
            transport,
            service: Arc::new(service),
            connection_config: self.connection_config,
        })
    }
}

impl Default for InfluenceServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Influence stream server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct InfluenceServer<B> {
    transport: WebSocketTransport,
    service: Arc<GameService<B, WebSocketConnection>>,
    connection_config: ConnectionConfig,
}

impl InfluenceServer<()> {
    /// Creates a new builder.
    pub fn builder() -> InfluenceServerBuilder {
        InfluenceServerBuilder::new()
    }
}

impl<B: KeyValueBackend> InfluenceServer<B> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, InfluenceError> {
        Ok(self.transport.local_addr()?)
    }

    /// The service behind the stream. Other surfaces (an HTTP router, a
    /// test) can call it directly and share the same hub.
    pub fn service(&self) -> &Arc<GameService<B, WebSocketConnection>> {
        &self.service
    }

    /// Runs the server accept loop.
    ///
    /// Each accepted socket gets its own task, which performs the WebSocket
    /// upgrade under `handshake_timeout` and then serves the connection.
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), InfluenceError> {
        tracing::info!(addr = ?self.transport.local_addr().ok(), "Influence server running");

        loop {
            match self.transport.accept().await {
                Ok(incoming) => {
                    let service = Arc::clone(&self.service);
                    let config = self.connection_config;
                    tokio::spawn(async move {
                        let addr = incoming.peer_addr();
                        let conn = match tokio::time::timeout(
                            config.handshake_timeout,
                            incoming.establish(),
                        )
                        .await
                        {
                            Ok(Ok(conn)) => conn,
                            Ok(Err(e)) => {
                                tracing::debug!(%addr, error = %e, "WebSocket upgrade failed");
                                return;
                            }
                            Err(_) => {
                                tracing::debug!(%addr, "WebSocket upgrade timed out");
                                return;
                            }
                        };
                        if let Err(e) = handle_connection(conn, service, config).await {
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
}
