//! Wyoming TCP server
//!
//! Accepts connections and hands each one to its own task. Tasks share only
//! the immutable [`Dispatcher`].

pub mod connection;
pub mod dispatcher;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::error::ProtocolError;

pub use connection::{Connection, ConnectionState};
pub use dispatcher::Dispatcher;

/// Bind, serve, and stop accepting on Ctrl-C.
pub async fn run(config: BridgeConfig) -> Result<()> {
    let dispatcher = Arc::new(Dispatcher::from_config(&config)?);

    let address = config.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("Listening on tcp://{}", listener.local_addr()?);

    tokio::select! {
        result = serve(listener, dispatcher) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown requested, no longer accepting connections");
            Ok(())
        }
    }
}

/// Accept loop. Never waits on a connection task.
pub async fn serve(listener: TcpListener, dispatcher: Arc<Dispatcher>) -> Result<()> {
    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                // Usually transient (EMFILE); back off briefly and keep accepting
                warn!("Accept failed: {}", e);
                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                continue;
            }
        };

        debug!("Accepted connection from {}", addr);
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move {
            handle_client(stream, addr.to_string(), dispatcher).await;
        });
    }
}

async fn handle_client(stream: TcpStream, peer: String, dispatcher: Arc<Dispatcher>) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!("Could not set TCP_NODELAY for {}: {}", peer, e);
    }

    let (reader, writer) = stream.into_split();
    match Connection::new(reader, writer, dispatcher, peer.clone()).run().await {
        Ok(()) => debug!("Connection {} closed", peer),
        Err(ProtocolError::Decode(reason)) => warn!("Dropping {}: {}", peer, reason),
        Err(e) => warn!("Connection {} failed: {}", peer, e),
    }
}
