//! Newline-delimited JSON client.
//!
//! One `LineClient` holds one TCP connection and a stable client identity:
//! a UUID `client_id` and a local write counter that is bumped before each
//! tagged write, exactly as a read-your-writes client must. The same
//! identity can be carried to another server with
//! [`LineClient::connect_with_identity`] to exercise server switches.

use bb_protocol::{Message, error_messages};
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The socket to the server failed mid-exchange.
    #[error("{}", error_messages::COMMUNICATION_ERROR)]
    Communication(#[source] std::io::Error),
    /// The server closed the connection without answering.
    #[error("{}", error_messages::COMMUNICATION_ERROR)]
    Closed,
    #[error("malformed response: {0}")]
    Protocol(#[from] serde_json::Error),
}

pub struct LineClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    client_id: String,
    write_counter: u64,
}

impl LineClient {
    /// Connect with a fresh random identity and counter 0.
    pub async fn connect(addr: SocketAddr) -> Result<Self, ClientError> {
        Self::connect_with_identity(addr, crate::fresh_client_id(), 0).await
    }

    /// Connect carrying an existing identity (the server-switch case).
    pub async fn connect_with_identity(
        addr: SocketAddr,
        client_id: String,
        write_counter: u64,
    ) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(ClientError::Communication)?;
        let (read_half, write_half) = stream.into_split();
        Ok(LineClient {
            reader: BufReader::new(read_half),
            writer: write_half,
            client_id,
            write_counter,
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn write_counter(&self) -> u64 {
        self.write_counter
    }

    /// Send one request and read the one-line response.
    pub async fn request(&mut self, message: &Message) -> Result<Message, ClientError> {
        let text = serde_json::to_string(message)?;
        self.request_raw(&text).await
    }

    /// Send a raw JSON line as-is. Lets tests exercise inputs the typed
    /// API cannot produce, such as unrecognized message types.
    pub async fn request_raw(&mut self, request: &str) -> Result<Message, ClientError> {
        let mut text = request.to_owned();
        text.push('\n');
        self.writer
            .write_all(text.as_bytes())
            .await
            .map_err(ClientError::Communication)?;

        let mut line = String::new();
        let read = self
            .reader
            .read_line(&mut line)
            .await
            .map_err(ClientError::Communication)?;
        if read == 0 {
            return Err(ClientError::Closed);
        }
        Ok(serde_json::from_str(line.trim_end())?)
    }

    /// Declare this client's identity and counter (`client_connect`).
    pub async fn announce(&mut self) -> Result<Message, ClientError> {
        let message = Message::ClientConnect {
            client_id: self.client_id.clone(),
            write_counter: self.write_counter,
        };
        self.request(&message).await
    }

    /// Post a root article without client tagging (sequential / quorum).
    pub async fn post(&mut self, title: &str, content: &str) -> Result<Message, ClientError> {
        let message = Message::PostArticle {
            title: title.to_owned(),
            content: content.to_owned(),
            client_id: None,
            write_counter: None,
        };
        self.request(&message).await
    }

    /// Reply to an article without client tagging.
    pub async fn reply(
        &mut self,
        parent_id: u64,
        title: &str,
        content: &str,
    ) -> Result<Message, ClientError> {
        let message = Message::ReplyArticle {
            parent_id,
            title: title.to_owned(),
            content: content.to_owned(),
            client_id: None,
            write_counter: None,
        };
        self.request(&message).await
    }

    /// Post with client tagging; bumps the write counter first.
    pub async fn post_tagged(
        &mut self,
        title: &str,
        content: &str,
    ) -> Result<Message, ClientError> {
        self.write_counter += 1;
        let message = Message::PostArticle {
            title: title.to_owned(),
            content: content.to_owned(),
            client_id: Some(self.client_id.clone()),
            write_counter: Some(self.write_counter),
        };
        self.request(&message).await
    }

    /// Reply with client tagging; bumps the write counter first.
    pub async fn reply_tagged(
        &mut self,
        parent_id: u64,
        title: &str,
        content: &str,
    ) -> Result<Message, ClientError> {
        self.write_counter += 1;
        let message = Message::ReplyArticle {
            parent_id,
            title: title.to_owned(),
            content: content.to_owned(),
            client_id: Some(self.client_id.clone()),
            write_counter: Some(self.write_counter),
        };
        self.request(&message).await
    }

    pub async fn read_articles(&mut self) -> Result<Message, ClientError> {
        self.request(&Message::ReadArticles).await
    }

    pub async fn read_article_content(&mut self, article_id: u64) -> Result<Message, ClientError> {
        self.request(&Message::ReadArticleContent { article_id }).await
    }
}
