//! Outgoing peer RPC.
//!
//! Every server-to-server exchange is one short-lived TCP connection: send
//! a newline-terminated JSON message, read one newline-terminated JSON
//! response, close. The whole exchange runs under a single bounded timeout
//! so a dead peer costs one timeout, never a hang.

use bb_protocol::Message;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};

#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("codec: {0}")]
    Codec(#[from] LinesCodecError),
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("peer closed without responding")]
    Closed,
    #[error("no response within {0:?}")]
    Timeout(Duration),
}

/// Send `message` to `addr` and wait for the single response line.
pub async fn call(
    addr: SocketAddr,
    message: &Message,
    limit: Duration,
) -> Result<Message, PeerError> {
    let text = serde_json::to_string(message)?;
    match tokio::time::timeout(limit, exchange(addr, text)).await {
        Ok(result) => result,
        Err(_) => Err(PeerError::Timeout(limit)),
    }
}

async fn exchange(addr: SocketAddr, text: String) -> Result<Message, PeerError> {
    let stream = TcpStream::connect(addr).await?;
    let mut framed = Framed::new(stream, LinesCodec::new());
    framed.send(text).await?;
    let line = framed.next().await.ok_or(PeerError::Closed)??;
    Ok(serde_json::from_str(&line)?)
}
