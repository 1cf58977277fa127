//! Server assembly: listener, per-connection tasks, background loops.
//!
//! A connection carries any number of newline-terminated JSON messages;
//! each is answered in order on the same connection. Framing uses a
//! buffered line codec, so messages that straddle read boundaries are
//! reassembled correctly.

use crate::allocator::IdAllocator;
use crate::config::{ConsistencyMode, ServerConfig};
use crate::dispatch;
use crate::replication;
use crate::rng::ServerRng;
use crate::sessions::SessionMap;
use crate::store::ArticleStore;
use bb_protocol::{Message, error_messages};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{debug, info, warn};

/// Everything a message handler can touch. One per server process, shared
/// across connection tasks and the replication loops.
#[derive(Debug)]
pub struct ServerState {
    pub config: ServerConfig,
    pub store: ArticleStore,
    pub sessions: SessionMap,
    pub allocator: IdAllocator,
    pub rng: ServerRng,
}

/// A bound but not yet running server.
pub struct Server {
    state: Arc<ServerState>,
    listener: TcpListener,
}

impl Server {
    /// Bind the configured listen address. Failure here is fatal to the
    /// caller; there is nothing to serve without the socket.
    pub async fn bind(config: ServerConfig) -> std::io::Result<Server> {
        let listener = TcpListener::bind(config.listen).await?;
        Ok(Server::with_listener(listener, config))
    }

    /// Assemble a server around an already-bound listener. Used by tests
    /// that bind port 0 first so the cluster list can name real ports.
    pub fn with_listener(listener: TcpListener, mut config: ServerConfig) -> Server {
        // Rewrite the configured address with the resolved one so peer
        // comparisons (quorum membership, self-exclusion) stay exact.
        if let Ok(addr) = listener.local_addr() {
            config.listen = addr;
        }
        let rng = ServerRng::new(config.timing.rng_seed);
        Server {
            state: Arc::new(ServerState {
                config,
                store: ArticleStore::new(),
                sessions: SessionMap::new(),
                allocator: IdAllocator::new(),
                rng,
            }),
            listener,
        }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.listener
            .local_addr()
            .expect("local_addr always succeeds after bind")
    }

    /// Start the accept loop and the mode's replication task. The returned
    /// handle keeps the server alive and stops it on `shutdown`.
    pub fn spawn(self) -> ServerHandle {
        let Server { state, listener } = self;
        let addr = listener
            .local_addr()
            .expect("local_addr always succeeds after bind");
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        info!(
            %addr,
            mode = ?state.config.mode,
            coordinator = state.config.coordinator,
            "server started"
        );

        let mut tasks = Vec::new();
        tasks.push(tokio::spawn(accept_loop(
            Arc::clone(&state),
            listener,
            shutdown_rx.clone(),
        )));
        match state.config.mode {
            ConsistencyMode::ReadYourWrites => {
                tasks.push(tokio::spawn(replication::propagate_loop(
                    Arc::clone(&state),
                    shutdown_rx,
                )));
            }
            ConsistencyMode::Quorum => {
                tasks.push(tokio::spawn(replication::sync_loop(
                    Arc::clone(&state),
                    shutdown_rx,
                )));
            }
            ConsistencyMode::Sequential => {}
        }

        ServerHandle {
            addr,
            state,
            shutdown: shutdown_tx,
            tasks,
        }
    }
}

/// A running server. Stops on [`ServerHandle::shutdown`], or when the
/// handle is dropped and the loops notice the closed channel.
pub struct ServerHandle {
    addr: SocketAddr,
    state: Arc<ServerState>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    /// Stop accepting connections and cancel the replication loops. The
    /// listener socket is released immediately.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
        for task in &self.tasks {
            task.abort();
        }
    }

    // Introspection for tests and operators.

    pub async fn article_count(&self) -> usize {
        self.state.store.len().await
    }

    pub async fn has_article(&self, id: u64) -> bool {
        self.state.store.contains(id).await
    }

    pub async fn session_counter(&self, client_id: &str) -> u64 {
        self.state.sessions.last_counter(client_id).await
    }
}

async fn accept_loop(
    state: Arc<ServerState>,
    listener: TcpListener,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                // A dropped sender means the handle is gone; stop too.
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer_addr)) => {
                        debug!(%peer_addr, "connection accepted");
                        tokio::spawn(serve_connection(Arc::clone(&state), stream));
                    }
                    Err(e) => {
                        warn!(error = %e, "accept failed");
                    }
                }
            }
        }
    }
}

/// Drive one connection: read newline-terminated JSON messages, dispatch
/// each, write the response. The simulated WAN latency runs before every
/// dispatch when enabled.
async fn serve_connection(state: Arc<ServerState>, stream: TcpStream) {
    let mut framed = Framed::new(stream, LinesCodec::new());
    while let Some(next) = framed.next().await {
        let line = match next {
            Ok(line) => line,
            Err(e) => {
                debug!(error = %e, "connection read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        if state.config.timing.simulate_latency {
            tokio::time::sleep(state.rng.latency_delay()).await;
        }

        let response = match serde_json::from_str::<Message>(&line) {
            Ok(message) => dispatch::handle_message(&state, message).await,
            Err(e) => {
                debug!(error = %e, "unparseable message");
                Message::error(error_messages::UNKNOWN_MESSAGE_TYPE)
            }
        };

        let text = match serde_json::to_string(&response) {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "response serialization failed");
                break;
            }
        };
        if let Err(e) = framed.send(text).await {
            debug!(error = %e, "connection write failed");
            break;
        }
    }
}
