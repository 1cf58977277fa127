//! The three consistency regimes.
//!
//! Each submodule owns one mode's write and read paths. What they share,
//! forwarding a write to the coordinator and serving reads straight from
//! the local store, lives here.

pub mod quorum;
pub mod ryw;
pub mod sequential;

use crate::peer;
use crate::server::ServerState;
use bb_protocol::{Message, error_messages};
use tracing::warn;

/// Forward a client write verbatim to the coordinator and relay its
/// response. Any RPC failure surfaces as the frozen coordinator error.
pub(crate) async fn forward_to_coordinator(state: &ServerState, request: &Message) -> Message {
    let coordinator = state.config.coordinator_addr;
    match peer::call(coordinator, request, state.config.timing.rpc_timeout).await {
        Ok(response) => response,
        Err(e) => {
            warn!(%coordinator, error = %e, "forwarding to coordinator failed");
            Message::error(error_messages::UNABLE_TO_CONTACT_COORDINATOR)
        }
    }
}

/// `read_articles` against the local store only.
pub(crate) async fn read_articles_local(state: &ServerState) -> Message {
    Message::ArticlesList {
        articles: state.store.summaries().await,
    }
}

/// `read_article_content` against the local store only.
pub(crate) async fn read_article_content_local(state: &ServerState, article_id: u64) -> Message {
    match state.store.get(article_id).await {
        Some(article) => Message::ArticleContent { article },
        None => Message::error(error_messages::ARTICLE_NOT_FOUND),
    }
}
