use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
};
use thiserror::Error as ThisError;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::codec::{CodecError, MessageCodec};
use crate::commands::Registry;
use crate::config::Config;
use crate::connection::Connection;
use crate::store::Store;

#[derive(Debug, ThisError)]
pub enum ServerError {
    #[error("failed to listen on {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },
    #[error("server is already running")]
    AlreadyRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Stopped,
    Starting,
    Running,
    Stopping,
}

enum Lifecycle {
    Stopped,
    Starting,
    Running(Running),
    Stopping,
}

struct Running {
    local_addr: SocketAddr,
    shutdown: CancellationToken,
    accept: JoinHandle<()>,
}

/// A RESP server.
///
/// Every accepted connection is served by its own task. Live connections are tracked so that
/// [`Server::stop`] can close them; stopping is forced and does not wait for in-flight
/// requests to complete.
pub struct Server {
    config: Config,
    shared: Arc<Shared>,
    lifecycle: Mutex<Lifecycle>,
}

/// State handed to the accept loop and to every connection task.
struct Shared {
    registry: Registry,
    store: Arc<dyn Store>,
    connections: RwLock<HashMap<Uuid, ConnectionHandle>>,
}

struct ConnectionHandle {
    client_address: SocketAddr,
    close: CancellationToken,
}

impl Server {
    pub fn new(config: Config, registry: Registry, store: Arc<dyn Store>) -> Server {
        Server {
            config,
            shared: Arc::new(Shared {
                registry,
                store,
                connections: RwLock::new(HashMap::new()),
            }),
            lifecycle: Mutex::new(Lifecycle::Stopped),
        }
    }

    /// Binds the configured address and starts accepting connections in the background.
    /// Returns the bound address, which differs from the configured one when port `0` is used.
    pub async fn start(&self) -> Result<SocketAddr, ServerError> {
        {
            let mut lifecycle = self.lifecycle();
            if !matches!(*lifecycle, Lifecycle::Stopped) {
                return Err(ServerError::AlreadyRunning);
            }
            *lifecycle = Lifecycle::Starting;
        }

        let address = self.config.address();
        let listener = match TcpListener::bind(&address).await {
            Ok(listener) => listener,
            Err(source) => {
                *self.lifecycle() = Lifecycle::Stopped;
                return Err(ServerError::Bind { address, source });
            }
        };
        let local_addr = match listener.local_addr() {
            Ok(local_addr) => local_addr,
            Err(source) => {
                *self.lifecycle() = Lifecycle::Stopped;
                return Err(ServerError::Bind { address, source });
            }
        };

        let shutdown = CancellationToken::new();
        let accept = tokio::spawn(accept_loop(
            listener,
            self.shared.clone(),
            self.config.max_frame_size,
            shutdown.clone(),
        ));

        *self.lifecycle() = Lifecycle::Running(Running {
            local_addr,
            shutdown,
            accept,
        });

        info!("Redis server listening on {}", local_addr);
        Ok(local_addr)
    }

    /// Closes every live connection and the listener. Does nothing unless the server is
    /// running.
    pub async fn stop(&self) {
        let running = {
            let mut lifecycle = self.lifecycle();
            match std::mem::replace(&mut *lifecycle, Lifecycle::Stopping) {
                Lifecycle::Running(running) => running,
                other => {
                    *lifecycle = other;
                    return;
                }
            }
        };

        info!("Stopping server listening on {}", running.local_addr);

        // Cancelling before closing connections stops the accept loop from registering new
        // ones, see `Shared::register`.
        running.shutdown.cancel();
        self.shared.close_all();

        // The listener is dropped, and thus closed, when the accept loop returns.
        if let Err(e) = running.accept.await {
            error!("Accept loop failed: {}", e);
        }

        *self.lifecycle() = Lifecycle::Stopped;
        info!("Server stopped");
    }

    pub fn state(&self) -> State {
        match *self.lifecycle() {
            Lifecycle::Stopped => State::Stopped,
            Lifecycle::Starting => State::Starting,
            Lifecycle::Running(_) => State::Running,
            Lifecycle::Stopping => State::Stopping,
        }
    }

    /// The bound address while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match *self.lifecycle() {
            Lifecycle::Running(ref running) => Some(running.local_addr),
            _ => None,
        }
    }

    /// Number of connections currently being served.
    pub fn connection_count(&self) -> usize {
        self.shared.read_connections().len()
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        if let Lifecycle::Running(ref running) = *self.lifecycle() {
            running.shutdown.cancel();
            self.shared.close_all();
        }
    }
}

impl Shared {
    /// Tracks a new connection. Returns `false`, without tracking it, once shutdown started.
    fn register(
        &self,
        id: Uuid,
        client_address: SocketAddr,
        close: CancellationToken,
        shutdown: &CancellationToken,
    ) -> bool {
        let mut connections = self.write_connections();
        if shutdown.is_cancelled() {
            return false;
        }
        connections.insert(
            id,
            ConnectionHandle {
                client_address,
                close,
            },
        );
        true
    }

    fn deregister(&self, id: &Uuid) {
        self.write_connections().remove(id);
    }

    fn close_all(&self) {
        let connections = self.write_connections();
        for (id, handle) in connections.iter() {
            debug!(connection_id = %id, client_address = %handle.client_address, "closing connection");
            handle.close.cancel();
        }
    }

    fn read_connections(&self) -> RwLockReadGuard<'_, HashMap<Uuid, ConnectionHandle>> {
        self.connections.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_connections(&self) -> RwLockWriteGuard<'_, HashMap<Uuid, ConnectionHandle>> {
        self.connections.write().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn accept_loop(
    listener: TcpListener,
    shared: Arc<Shared>,
    max_frame_size: usize,
    shutdown: CancellationToken,
) {
    loop {
        let (socket, client_address) = tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    continue;
                }
            },
        };

        info!("Accepted connection from {:?}", client_address);

        let conn =
            Connection::with_codec(socket, client_address, MessageCodec::new(max_frame_size));
        let id = conn.id;
        let close = CancellationToken::new();

        if !shared.register(id, client_address, close.clone(), &shutdown) {
            break;
        }

        let shared = shared.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(conn, &shared, close).await {
                warn!(connection_id = %id, "Connection terminated: {}", e);
            }
            shared.deregister(&id);
        });
    }

    debug!("Accept loop finished");
}

/// Serves one client: read a request, reply, repeat. A single request is fully answered before
/// the next one is read.
#[instrument(
    name = "connection",
    skip_all,
    fields(connection_id = %conn.id, client_address = %conn.client_address)
)]
async fn handle_connection(
    mut conn: Connection,
    shared: &Shared,
    close: CancellationToken,
) -> Result<(), CodecError> {
    loop {
        let message = tokio::select! {
            _ = close.cancelled() => {
                info!("Connection closed by server");
                return Ok(());
            }
            message = conn.read_message() => message?,
        };

        let Some(message) = message else {
            break;
        };

        debug!("Received message from client: {}", message);
        let reply = shared.registry.handle(message, shared.store.as_ref());
        debug!("Sending reply to client: {}", reply);

        tokio::select! {
            _ = close.cancelled() => {
                info!("Connection closed by server");
                return Ok(());
            }
            written = conn.write_message(reply) => written?,
        }
    }

    info!("Connection closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn server(port: u16) -> Server {
        let config = Config {
            port,
            ..Config::default()
        };
        Server::new(config, Registry::with_builtins(), Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn start_and_stop() {
        let server = server(0);
        assert_eq!(server.state(), State::Stopped);
        assert_eq!(server.local_addr(), None);

        let addr = server.start().await.unwrap();
        assert_eq!(server.state(), State::Running);
        assert_eq!(server.local_addr(), Some(addr));
        assert_ne!(addr.port(), 0);

        server.stop().await;
        assert_eq!(server.state(), State::Stopped);
        assert_eq!(server.local_addr(), None);
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let server = server(0);

        server.stop().await;
        assert_eq!(server.state(), State::Stopped);

        server.start().await.unwrap();
        server.stop().await;
        server.stop().await;
        assert_eq!(server.state(), State::Stopped);
    }

    #[tokio::test]
    async fn start_twice() {
        let server = server(0);
        server.start().await.unwrap();

        let err = server.start().await.unwrap_err();
        assert!(matches!(err, ServerError::AlreadyRunning));

        server.stop().await;
    }

    #[tokio::test]
    async fn bind_failure() {
        let first = server(0);
        let addr = first.start().await.unwrap();

        let second = server(addr.port());
        let err = second.start().await.unwrap_err();

        assert!(matches!(err, ServerError::Bind { .. }));
        assert_eq!(second.state(), State::Stopped);

        first.stop().await;
    }

    #[tokio::test]
    async fn restart_after_stop() {
        let server = server(0);

        server.start().await.unwrap();
        server.stop().await;
        server.start().await.unwrap();

        assert_eq!(server.state(), State::Running);
        server.stop().await;
    }
}
