//! Sequential consistency.
//!
//! Every replica observes writes in the coordinator's allocation order.
//! A non-coordinator forwards the client's write verbatim; the coordinator
//! allocates the id, applies locally, and broadcasts `new_article` to all
//! peers from a detached task. The client's `post_success` is returned
//! after the local append without waiting on peer acks. A peer that misses
//! the broadcast stays behind, as this mode has no anti-entropy.

use super::forward_to_coordinator;
use crate::peer;
use crate::server::ServerState;
use bb_protocol::{Article, Message};
use std::sync::Arc;
use tracing::warn;

/// Handle `post_article` / `reply_article`.
pub(crate) async fn handle_write(state: &Arc<ServerState>, request: Message) -> Message {
    if !state.config.coordinator {
        return forward_to_coordinator(state, &request).await;
    }

    let (parent_id, title, content) = match request {
        Message::PostArticle { title, content, .. } => (None, title, content),
        Message::ReplyArticle {
            parent_id,
            title,
            content,
            ..
        } => (Some(parent_id), title, content),
        other => {
            // Dispatch only routes writes here.
            warn!(?other, "non-write message on the sequential write path");
            return Message::error(bb_protocol::error_messages::UNKNOWN_MESSAGE_TYPE);
        }
    };

    let article_id = state.allocator.allocate();
    let article = Article {
        id: article_id,
        parent_id,
        title,
        content,
        client_id: None,
        write_counter: None,
    };
    state.store.insert(article.clone()).await;

    // Best-effort broadcast. The client's ack does not wait on peers, and
    // a failed peer RPC is logged, not retried.
    let state = Arc::clone(state);
    tokio::spawn(async move {
        broadcast(&state, article).await;
    });

    Message::PostSuccess { article_id }
}

async fn broadcast(state: &ServerState, article: Article) {
    let message = Message::NewArticle { article };
    for addr in state.config.peers() {
        match peer::call(addr, &message, state.config.timing.rpc_timeout).await {
            Ok(Message::ArticleAck { .. }) => {}
            Ok(other) => warn!(peer = %addr, ?other, "unexpected propagation response"),
            Err(e) => warn!(peer = %addr, error = %e, "article propagation failed"),
        }
    }
}

/// Handle `new_article` from the coordinator: apply and ack. Redelivery is
/// absorbed by store dedup.
pub(crate) async fn handle_new_article(state: &ServerState, article: Article) -> Message {
    let article_id = article.id;
    state.store.insert(article).await;
    Message::ArticleAck { article_id }
}
