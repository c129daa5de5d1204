//! `LotoServer` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → room registry.

use std::sync::Arc;

use loto_protocol::{Codec, JsonCodec};
use loto_room::{RegistryConfig, RoomRegistry};

use crate::ServerError;
use crate::config::{DEFAULT_BIND, ServerConfig};
use crate::handler::handle_connection;
use crate::transport::WebSocketTransport;

/// Shared state handed to each connection task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) registry: Arc<RoomRegistry>,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a server.
///
/// # Example
///
/// ```rust,no_run
/// # async fn demo() -> Result<(), loto_server::ServerError> {
/// let server = loto_server::LotoServer::builder()
///     .bind("127.0.0.1:3000")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct LotoServerBuilder {
    bind_addr: String,
    registry_config: RegistryConfig,
}

impl LotoServerBuilder {
    pub fn new() -> Self {
        Self {
            bind_addr: DEFAULT_BIND.to_string(),
            registry_config: RegistryConfig::default(),
        }
    }

    /// Starts from a [`ServerConfig`], typically read from the environment.
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            bind_addr: config.bind_addr.clone(),
            registry_config: config.registry_config(),
        }
    }

    /// Sets the address to bind to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    pub fn registry_config(mut self, config: RegistryConfig) -> Self {
        self.registry_config = config;
        self
    }

    /// Binds the listener. Uses [`JsonCodec`], which is what browser
    /// clients speak.
    pub async fn build(self) -> Result<LotoServer<JsonCodec>, ServerError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let state = Arc::new(ServerState {
            registry: Arc::new(RoomRegistry::new(self.registry_config)),
            codec: JsonCodec,
        });
        Ok(LotoServer { transport, state })
    }
}

impl Default for LotoServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound server. Call [`run()`](Self::run) to start accepting.
pub struct LotoServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl LotoServer<JsonCodec> {
    pub fn builder() -> LotoServerBuilder {
        LotoServerBuilder::new()
    }
}

impl<C: Codec> LotoServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// The registry behind this server.
    pub fn registry(&self) -> Arc<RoomRegistry> {
        Arc::clone(&self.state.registry)
    }

    /// Runs the accept loop until the process is terminated. A failed
    /// accept or upgrade is logged and skipped.
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!(addr = ?self.local_addr().ok(), "Lô Tô server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                }
            }
        }
    }
}
