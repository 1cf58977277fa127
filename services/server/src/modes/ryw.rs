//! Read-your-writes consistency.
//!
//! Any server accepts writes; ids still come from the coordinator's
//! allocator (remotely when needed). Articles carry the writing client's
//! `(client_id, write_counter)` tag, and each server tracks the highest
//! counter it has applied per client. When a client reconnects declaring a
//! counter ahead of the local record, the gap is fetched from peers in the
//! background; the periodic propagation loop converges everyone else.

use crate::peer;
use crate::server::ServerState;
use bb_protocol::{Article, Message, error_messages};
use std::sync::Arc;
use tracing::{debug, warn};

/// Handle `post_article` / `reply_article` on any server.
pub(crate) async fn handle_write(state: &Arc<ServerState>, request: Message) -> Message {
    let (parent_id, title, content, client_id, write_counter) = match request {
        Message::PostArticle {
            title,
            content,
            client_id,
            write_counter,
        } => (None, title, content, client_id, write_counter),
        Message::ReplyArticle {
            parent_id,
            title,
            content,
            client_id,
            write_counter,
        } => (Some(parent_id), title, content, client_id, write_counter),
        other => {
            warn!(?other, "non-write message on the read-your-writes write path");
            return Message::error(error_messages::UNKNOWN_MESSAGE_TYPE);
        }
    };

    let Some(article_id) = next_article_id(state).await else {
        return Message::error(error_messages::FAILED_ID_FROM_COORDINATOR);
    };

    let article = Article {
        id: article_id,
        parent_id,
        title,
        content,
        client_id: client_id.clone(),
        write_counter,
    };
    state.store.insert(article).await;
    if let (Some(client_id), Some(counter)) = (client_id, write_counter) {
        state.sessions.observe(&client_id, counter).await;
    }

    Message::PostSuccess { article_id }
}

/// Allocate locally on the coordinator, remotely otherwise.
async fn next_article_id(state: &ServerState) -> Option<u64> {
    if state.config.coordinator {
        return Some(state.allocator.allocate());
    }
    let coordinator = state.config.coordinator_addr;
    match peer::call(
        coordinator,
        &Message::GetNextArticleId,
        state.config.timing.rpc_timeout,
    )
    .await
    {
        Ok(Message::NextArticleId { article_id }) => Some(article_id),
        Ok(other) => {
            warn!(%coordinator, ?other, "unexpected id allocation response");
            None
        }
        Err(e) => {
            warn!(%coordinator, error = %e, "id allocation failed");
            None
        }
    }
}

/// Handle `client_connect`: if the client declares writes this server has
/// not applied, fetch them from peers in the background. The ack does not
/// wait for the fetch.
pub(crate) async fn handle_client_connect(
    state: &Arc<ServerState>,
    client_id: String,
    write_counter: u64,
) -> Message {
    let missing = state
        .sessions
        .missing_counters(&client_id, write_counter)
        .await;
    if !missing.is_empty() {
        debug!(client = %client_id, ?missing, "fetching missed client writes");
        let state = Arc::clone(state);
        tokio::spawn(async move {
            fetch_missing(&state, &client_id, &missing).await;
        });
    }
    Message::ConnectAck
}

/// Ask every peer for the client's writes at the given counters and apply
/// whatever comes back.
async fn fetch_missing(state: &ServerState, client_id: &str, counters: &[u64]) {
    let request = Message::RequestMissingArticles {
        client_id: client_id.to_owned(),
        counters: counters.to_vec(),
    };
    for addr in state.config.peers() {
        match peer::call(addr, &request, state.config.timing.rpc_timeout).await {
            Ok(Message::SendMissingArticles { articles }) => {
                apply_incoming(state, articles).await;
            }
            Ok(other) => warn!(peer = %addr, ?other, "unexpected missing-articles response"),
            Err(e) => warn!(peer = %addr, error = %e, "missing-articles fetch failed"),
        }
    }
}

/// Handle `request_missing_articles` from a peer.
pub(crate) async fn handle_request_missing(
    state: &ServerState,
    client_id: &str,
    counters: &[u64],
) -> Message {
    Message::SendMissingArticles {
        articles: state.store.client_writes(client_id, counters).await,
    }
}

/// Handle `new_articles` (bulk propagation from a peer): keep what is new,
/// advance session counters for exactly those.
pub(crate) async fn handle_new_articles(state: &ServerState, articles: Vec<Article>) -> Message {
    apply_incoming(state, articles).await;
    Message::Ack
}

/// Handle a single propagated `new_article`.
pub(crate) async fn handle_new_article(state: &ServerState, article: Article) -> Message {
    let article_id = article.id;
    apply_incoming(state, vec![article]).await;
    Message::ArticleAck { article_id }
}

async fn apply_incoming(state: &ServerState, articles: Vec<Article>) {
    let inserted = state.store.insert_all(articles).await;
    for article in inserted {
        if let (Some(client_id), Some(counter)) = (article.client_id, article.write_counter) {
            state.sessions.observe(&client_id, counter).await;
        }
    }
}
