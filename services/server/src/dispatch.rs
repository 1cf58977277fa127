//! Message dispatch.
//!
//! Routes each parsed message to the handler for the configured
//! consistency mode. Mode gating is part of the wire contract: a message
//! that only exists in another mode gets the frozen invalid-for-model
//! error, and a tag the dispatcher does not accept as a request (including
//! response types arriving unsolicited) gets the unknown-type error.

use crate::config::ConsistencyMode;
use crate::modes::{self, quorum, ryw, sequential};
use crate::server::ServerState;
use bb_protocol::{Message, error_messages};
use std::sync::Arc;

pub async fn handle_message(state: &Arc<ServerState>, message: Message) -> Message {
    let mode = state.config.mode;
    match message {
        Message::ClientConnect {
            client_id,
            write_counter,
        } => match mode {
            ConsistencyMode::ReadYourWrites => {
                ryw::handle_client_connect(state, client_id, write_counter).await
            }
            // Other modes have no session tracking; the connect is a no-op.
            _ => Message::ConnectAck,
        },

        request @ (Message::PostArticle { .. } | Message::ReplyArticle { .. }) => match mode {
            ConsistencyMode::Sequential => sequential::handle_write(state, request).await,
            ConsistencyMode::ReadYourWrites => ryw::handle_write(state, request).await,
            ConsistencyMode::Quorum => quorum::handle_write(state, request).await,
        },

        Message::ReadArticles => match mode {
            ConsistencyMode::Quorum => quorum::read_articles(state).await,
            _ => modes::read_articles_local(state).await,
        },

        Message::ReadArticleContent { article_id } => match mode {
            ConsistencyMode::Quorum => quorum::read_article_content(state, article_id).await,
            _ => modes::read_article_content_local(state, article_id).await,
        },

        Message::NewArticle { article } => match mode {
            ConsistencyMode::Sequential => sequential::handle_new_article(state, article).await,
            ConsistencyMode::ReadYourWrites => ryw::handle_new_article(state, article).await,
            ConsistencyMode::Quorum => Message::error(error_messages::INVALID_FOR_MODEL),
        },

        Message::NewArticles { articles } => match mode {
            ConsistencyMode::ReadYourWrites => ryw::handle_new_articles(state, articles).await,
            _ => Message::error(error_messages::INVALID_FOR_MODEL),
        },

        Message::WriteArticle { article } => match mode {
            ConsistencyMode::Quorum => quorum::handle_write_article(state, article).await,
            _ => Message::error(error_messages::INVALID_FOR_MODEL),
        },

        Message::RequestMissingArticles {
            client_id,
            counters,
        } => match mode {
            ConsistencyMode::ReadYourWrites => {
                ryw::handle_request_missing(state, &client_id, &counters).await
            }
            _ => Message::error(error_messages::INVALID_FOR_MODEL),
        },

        // Peer state pulls are served in every mode.
        Message::GetArticles => Message::ArticlesList {
            articles: state.store.full_listings().await,
        },
        Message::GetArticleContent { article_id } => {
            modes::read_article_content_local(state, article_id).await
        }

        Message::GetNextArticleId => {
            if state.config.coordinator {
                Message::NextArticleId {
                    article_id: state.allocator.allocate(),
                }
            } else {
                Message::error(error_messages::NOT_COORDINATOR)
            }
        }

        // Response types are never valid as requests.
        Message::PostSuccess { .. }
        | Message::ArticlesList { .. }
        | Message::ArticleContent { .. }
        | Message::ArticleAck { .. }
        | Message::WriteAck
        | Message::ConnectAck
        | Message::Ack
        | Message::SendMissingArticles { .. }
        | Message::NextArticleId { .. }
        | Message::Error { .. } => Message::error(error_messages::UNKNOWN_MESSAGE_TYPE),
    }
}
