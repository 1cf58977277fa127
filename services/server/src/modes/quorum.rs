//! Quorum consistency.
//!
//! Tunable `(N, NR, NW)` over the full server list, validated at startup
//! so that `NR + NW > N` and `NW > N/2`. Writes run on the coordinator
//! against a random `NW`-subset (possibly including itself); reads merge a
//! random `NR`-subset. The overlap guarantee means every read quorum
//! intersects every committed write quorum in at least one replica.

use super::forward_to_coordinator;
use crate::peer;
use crate::rng::ServerRng;
use crate::server::ServerState;
use bb_protocol::{Article, ArticleListing, Message, error_messages};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Uniform random quorum of `size` members drawn from `servers` without
/// replacement. The local server is a candidate like any other.
pub(crate) fn select_quorum(
    rng: &ServerRng,
    servers: &[SocketAddr],
    size: usize,
) -> Vec<SocketAddr> {
    rng.sample(servers, size)
}

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
            warn!(?other, "non-write message on the quorum write path");
            return Message::error(error_messages::UNKNOWN_MESSAGE_TYPE);
        }
    };

    let quorum_size = state
        .config
        .quorum
        .expect("quorum params validated at startup")
        .nw;
    let article_id = state.allocator.allocate();
    let article = Article {
        id: article_id,
        parent_id,
        title,
        content,
        client_id: None,
        write_counter: None,
    };

    let members = select_quorum(&state.rng, &state.config.servers, quorum_size);
    debug!(article_id, ?members, "write quorum selected");

    let write_message = Message::WriteArticle {
        article: article.clone(),
    };
    let mut acks = 0usize;
    for addr in members {
        if addr == state.config.listen {
            state.store.insert(article.clone()).await;
            acks += 1;
            continue;
        }
        match peer::call(addr, &write_message, state.config.timing.rpc_timeout).await {
            Ok(Message::WriteAck) => acks += 1,
            Ok(other) => warn!(peer = %addr, ?other, "unexpected quorum write response"),
            Err(e) => warn!(peer = %addr, error = %e, "quorum write failed"),
        }
    }

    if acks >= quorum_size {
        Message::PostSuccess { article_id }
    } else {
        // The allocated id is now a permanent gap in the sequence.
        warn!(article_id, acks, quorum_size, "write quorum not reached");
        Message::error(error_messages::FAILED_WRITE_QUORUM)
    }
}

/// Handle `write_article` from the coordinator: apply and ack.
pub(crate) async fn handle_write_article(state: &ServerState, article: Article) -> Message {
    state.store.insert(article).await;
    Message::WriteAck
}

/// Handle `read_articles`: merge listings from a random read quorum,
/// first occurrence of each id wins, sorted ascending by id.
pub(crate) async fn read_articles(state: &ServerState) -> Message {
    let quorum_size = state
        .config
        .quorum
        .expect("quorum params validated at startup")
        .nr;
    let members = select_quorum(&state.rng, &state.config.servers, quorum_size);

    let mut merged: BTreeMap<u64, ArticleListing> = BTreeMap::new();
    for addr in members {
        if addr == state.config.listen {
            for article in state.store.snapshot().await {
                merged.entry(article.id).or_insert_with(|| article.summary());
            }
            continue;
        }
        match peer::call(addr, &Message::GetArticles, state.config.timing.rpc_timeout).await {
            Ok(Message::ArticlesList { articles }) => {
                for listing in articles {
                    merged.entry(listing.id).or_insert(listing);
                }
            }
            Ok(other) => warn!(peer = %addr, ?other, "unexpected read quorum response"),
            Err(e) => warn!(peer = %addr, error = %e, "read quorum fetch failed"),
        }
    }

    let articles = merged
        .into_values()
        .map(|listing| ArticleListing {
            content: None,
            ..listing
        })
        .collect();
    Message::ArticlesList { articles }
}

/// Handle `read_article_content`: probe the read quorum until one member
/// holds the article.
pub(crate) async fn read_article_content(state: &ServerState, article_id: u64) -> Message {
    let quorum_size = state
        .config
        .quorum
        .expect("quorum params validated at startup")
        .nr;
    let members = select_quorum(&state.rng, &state.config.servers, quorum_size);

    for addr in members {
        if addr == state.config.listen {
            if let Some(article) = state.store.get(article_id).await {
                return Message::ArticleContent { article };
            }
            continue;
        }
        match peer::call(
            addr,
            &Message::GetArticleContent { article_id },
            state.config.timing.rpc_timeout,
        )
        .await
        {
            Ok(Message::ArticleContent { article }) => {
                return Message::ArticleContent { article };
            }
            // A peer without the article answers with the not-found error;
            // keep probing the rest of the quorum.
            Ok(_) => {}
            Err(e) => warn!(peer = %addr, error = %e, "read quorum fetch failed"),
        }
    }
    Message::error(error_messages::ARTICLE_NOT_FOUND)
}
