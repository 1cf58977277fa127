// bb-protocol: Bulletin-board wire protocol types and serialization.
//
// Every message on the wire is a UTF-8 JSON object terminated by a newline
// byte, with a top-level `type` field used for discriminated deserialization.
// The enum variants map 1:1 to the message types exchanged between clients,
// servers, and the coordinator.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Article model
// ---------------------------------------------------------------------------

/// An immutable post or reply, identified by a cluster-unique integer.
///
/// IDs are allocated by the coordinator and are strictly increasing in
/// allocation order; a reply's `parent_id` therefore always sorts below its
/// own `id`. Articles are never modified or deleted once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: u64,
    /// `None` for root articles; serialized as JSON `null`.
    pub parent_id: Option<u64>,
    pub title: String,
    pub content: String,
    /// Originating client, tracked only under read-your-writes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// The client's 1-based write sequence number at write time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_counter: Option<u64>,
}

impl Article {
    /// Listing row for client-facing reads: id, parent, and title only.
    pub fn summary(&self) -> ArticleListing {
        ArticleListing {
            id: self.id,
            parent_id: self.parent_id,
            title: self.title.clone(),
            content: None,
        }
    }

    /// Listing row for peer state exchange, carrying the full content.
    pub fn full_listing(&self) -> ArticleListing {
        ArticleListing {
            id: self.id,
            parent_id: self.parent_id,
            title: self.title.clone(),
            content: Some(self.content.clone()),
        }
    }
}

/// One row of an `articles_list` response.
///
/// `content` is present when a peer ships full state (`get_articles`) and
/// absent on client-facing `read_articles` listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleListing {
    pub id: u64,
    pub parent_id: Option<u64>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl From<ArticleListing> for Article {
    /// Rehydrate a listing into a store record. A listing without content
    /// (a bare summary) yields an empty body, matching the merge behavior
    /// of the quorum read path.
    fn from(listing: ArticleListing) -> Self {
        Article {
            id: listing.id,
            parent_id: listing.parent_id,
            title: listing.title,
            content: listing.content.unwrap_or_default(),
            client_id: None,
            write_counter: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Frozen error strings
// ---------------------------------------------------------------------------

/// Error strings carried in `{"type":"error","message":...}` responses.
///
/// These are part of the wire contract; clients match on them literally.
pub mod error_messages {
    pub const UNKNOWN_MESSAGE_TYPE: &str = "Unknown message type";
    pub const INVALID_FOR_MODEL: &str = "Invalid message type for this consistency model";
    pub const ARTICLE_NOT_FOUND: &str = "Article not found";
    pub const UNABLE_TO_CONTACT_COORDINATOR: &str = "Unable to contact coordinator";
    pub const FAILED_ID_FROM_COORDINATOR: &str = "Failed to get article ID from coordinator";
    pub const FAILED_WRITE_QUORUM: &str = "Failed to write to quorum";
    pub const NOT_COORDINATOR: &str = "Not coordinator";
    /// Client-side only: the socket to the server failed mid-exchange.
    pub const COMMUNICATION_ERROR: &str = "Communication error";
}

// ---------------------------------------------------------------------------
// Top-level discriminated union
// ---------------------------------------------------------------------------

/// All message types in the protocol, requests and responses alike.
///
/// Serializes/deserializes using the `type` field as a tag:
///
/// ```json
/// { "type": "post_article", "title": "...", "content": "..." }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum Message {
    // -- client → server -------------------------------------------------
    /// Declare `(client_id, write_counter)` on connect; under
    /// read-your-writes this triggers a gap fetch for any missing writes.
    ClientConnect {
        client_id: String,
        write_counter: u64,
    },
    /// Create a root article.
    PostArticle {
        title: String,
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        write_counter: Option<u64>,
    },
    /// Create a reply. Parent existence is not validated.
    ReplyArticle {
        parent_id: u64,
        title: String,
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        write_counter: Option<u64>,
    },
    /// List `(id, parent_id, title)` of every locally observed article.
    ReadArticles,
    /// Fetch one full article by id.
    ReadArticleContent { article_id: u64 },

    // -- server ↔ server -------------------------------------------------
    /// Coordinator → peer, sequential mode: propagate a single article.
    NewArticle { article: Article },
    /// Peer → peer, read-your-writes: bulk propagate the full article set.
    NewArticles { articles: Vec<Article> },
    /// Coordinator → peer, quorum mode: write one member of the quorum.
    WriteArticle { article: Article },
    /// Pull a peer's full article state (anti-entropy, read quorums).
    GetArticles,
    /// Pull one article from a peer (single-article read quorums).
    GetArticleContent { article_id: u64 },
    /// Fetch a client's writes matching the given counters.
    RequestMissingArticles {
        client_id: String,
        counters: Vec<u64>,
    },
    /// Ask the coordinator to allocate the next article id.
    GetNextArticleId,

    // -- responses --------------------------------------------------------
    PostSuccess { article_id: u64 },
    ArticlesList { articles: Vec<ArticleListing> },
    ArticleContent { article: Article },
    ArticleAck { article_id: u64 },
    WriteAck,
    ConnectAck,
    /// Generic acknowledgement of a bulk propagate.
    Ack,
    SendMissingArticles { articles: Vec<Article> },
    NextArticleId { article_id: u64 },
    Error { message: String },
}

impl Message {
    /// Shorthand for an error response carrying one of the frozen strings.
    pub fn error(message: &str) -> Self {
        Message::Error {
            message: message.to_owned(),
        }
    }
}
