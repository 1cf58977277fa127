//! Background replication loops.
//!
//! One long-lived task per mode: read-your-writes broadcasts the full
//! article set to every peer on a short period, quorum mode pulls every
//! peer's state on a longer one. Sequential mode runs neither. Failures
//! are logged and the loop stays on schedule; both loops stop when the
//! shutdown flag flips.

use crate::peer;
use crate::server::ServerState;
use bb_protocol::{Article, Message};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Read-your-writes propagation: every `propagate_interval`, send the whole
/// local article list to each peer as `new_articles`. Receivers dedup by
/// id, so the repeated full broadcast is wasteful but harmless.
pub async fn propagate_loop(state: Arc<ServerState>, mut shutdown: watch::Receiver<bool>) {
    let interval = state.config.timing.propagate_interval;
    loop {
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                // A dropped sender means the server is gone; stop too.
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            () = tokio::time::sleep(interval) => {
                propagate_round(&state).await;
            }
        }
    }
}

async fn propagate_round(state: &ServerState) {
    let articles = state.store.snapshot().await;
    let message = Message::NewArticles { articles };
    for addr in state.config.peers() {
        match peer::call(addr, &message, state.config.timing.rpc_timeout).await {
            Ok(Message::Ack) => {}
            Ok(other) => warn!(peer = %addr, ?other, "unexpected propagation response"),
            Err(e) => warn!(peer = %addr, error = %e, "bulk propagation failed"),
        }
    }
}

/// Quorum anti-entropy: every `sync_interval`, pull `get_articles` from
/// each peer and keep whatever is missing locally. Bounds divergence after
/// partial writes.
pub async fn sync_loop(state: Arc<ServerState>, mut shutdown: watch::Receiver<bool>) {
    let interval = state.config.timing.sync_interval;
    loop {
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                // A dropped sender means the server is gone; stop too.
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            () = tokio::time::sleep(interval) => {
                sync_round(&state).await;
            }
        }
    }
}

async fn sync_round(state: &ServerState) {
    for addr in state.config.peers() {
        match peer::call(addr, &Message::GetArticles, state.config.timing.rpc_timeout).await {
            Ok(Message::ArticlesList { articles }) => {
                let incoming: Vec<Article> = articles.into_iter().map(Article::from).collect();
                let inserted = state.store.insert_all(incoming).await;
                if !inserted.is_empty() {
                    debug!(peer = %addr, count = inserted.len(), "synchronized missing articles");
                }
            }
            Ok(other) => warn!(peer = %addr, ?other, "unexpected synchronization response"),
            Err(e) => warn!(peer = %addr, error = %e, "synchronization failed"),
        }
    }
}
