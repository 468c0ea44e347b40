//! `ZoneServer` builder and accept loop.
//!
//! This is the entry point for running a zone. It ties the layers
//! together: transport → protocol → session → dispatch.

use std::net::SocketAddr;
use std::sync::Arc;

use a3zone_transport::{TcpLineTransport, Transport, WebSocketTransport};
use tokio::sync::watch;

use crate::ZoneError;
use crate::config::ZoneConfig;
use crate::context::ZoneContext;
use crate::handler::handle_connection;
use crate::tick;

/// Builder for configuring and starting a zone server.
///
/// # Example
///
/// ```rust,ignore
/// use a3zone::{ZoneConfig, ZoneServer};
///
/// let server = ZoneServer::builder()
///     .config(ZoneConfig::load_with_env("config.json"))
///     .bind("127.0.0.1:7777")
///     .build_tcp()
///     .await?;
/// server.run().await
/// ```
#[derive(Debug, Default)]
pub struct ZoneServerBuilder {
    config: ZoneConfig,
    bind_addr: Option<String>,
}

impl ZoneServerBuilder {
    /// Creates a builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration. Out-of-range values are normalized.
    pub fn config(mut self, config: ZoneConfig) -> Self {
        self.config = config.normalized();
        self
    }

    /// Overrides the `bind_host:listen_port` address from the config.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = Some(addr.to_string());
        self
    }

    fn address(&self) -> Result<String, ZoneError> {
        match &self.bind_addr {
            Some(addr) => Ok(addr.clone()),
            None => Ok(self.config.bind_addr()?),
        }
    }

    /// Binds a newline-delimited JSON listener capped at the configured
    /// frame size.
    pub async fn build_tcp(self) -> Result<ZoneServer<TcpLineTransport>, ZoneError> {
        let addr = self.address()?;
        let max_frame = self.config.limits.max_frame_len();
        let transport = TcpLineTransport::bind_with_limit(&addr, max_frame).await?;
        self.build_with(transport)
    }

    /// Binds a WebSocket listener.
    pub async fn build_websocket(self) -> Result<ZoneServer<WebSocketTransport>, ZoneError> {
        let addr = self.address()?;
        let transport = WebSocketTransport::bind(&addr).await?;
        self.build_with(transport)
    }

    /// Builds a server around an already bound transport.
    pub fn build_with<T: Transport>(self, transport: T) -> Result<ZoneServer<T>, ZoneError> {
        self.config.validate()?;
        let ctx = Arc::new(ZoneContext::new(self.config));
        Ok(ZoneServer { transport, ctx })
    }
}

/// A bound zone server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct ZoneServer<T: Transport> {
    transport: T,
    ctx: Arc<ZoneContext>,
}

impl ZoneServer<TcpLineTransport> {
    /// Creates a new builder.
    pub fn builder() -> ZoneServerBuilder {
        ZoneServerBuilder::new()
    }
}

impl<T: Transport> ZoneServer<T> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), ZoneError> {
        let (_keep_open, shutdown) = watch::channel(false);
        self.run_until(shutdown).await
    }

    /// Runs the accept loop until `shutdown` becomes `true` or its sender
    /// is dropped.
    ///
    /// Stopping only stops accepting: connections already being served
    /// keep their tasks and finish when their peers close.
    pub async fn run_until(mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), ZoneError> {
        let addr = self.transport.local_addr()?;
        tracing::info!(
            %addr,
            server = %self.ctx.config.server_name,
            transport = ?self.ctx.config.transport,
            "zone server listening"
        );

        let ticker = tokio::spawn(tick::run(Arc::clone(&self.ctx), shutdown.clone()));

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let ctx = Arc::clone(&self.ctx);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, ctx).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }

        if let Err(e) = ticker.await {
            tracing::debug!(error = %e, "tick task ended abnormally");
        }
        tracing::info!(%addr, "zone server stopped accepting");
        Ok(())
    }
}
