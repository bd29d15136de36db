//! WebSocket client for the analysis server.
//!
//! Client messages: `{"type":"start"}`, then
//! `{"type":"frame","frame":<n>,"data":<base64 jpeg>}` per frame, then
//! `{"type":"stop"}`. The server answers with `{"type":"connected"}`,
//! `{"type":"result", ...verdict}` or `{"type":"error","message":..}`.

use super::{AnalysisChannel, ChannelMode, Frame, VideoVerdict};
use crate::{Error, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Messages sent to the server
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Begin a stream
    Start,
    /// One frame
    Frame {
        /// Sequence number
        frame: u64,
        /// Base64 JPEG
        data: String,
    },
    /// End the stream
    Stop,
}

/// Messages received from the server
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Connection acknowledged
    Connected {
        /// Greeting
        #[serde(default)]
        message: Option<String>,
    },
    /// Verdict for the stream so far
    Result(VideoVerdict),
    /// Server-side failure
    Error {
        /// Failure description
        #[serde(default)]
        message: Option<String>,
    },
}

/// Remote analysis channel
pub struct RemoteChannel {
    socket: Socket,
    response_timeout: Duration,
    closed: bool,
}

impl RemoteChannel {
    /// Open the socket and start a stream
    pub async fn connect(url: &str, response_timeout: Duration) -> Result<Self> {
        let (socket, _) = connect_async(url)
            .await
            .map_err(|e| Error::Channel(format!("connect to {} failed: {}", url, e)))?;

        let mut channel = Self {
            socket,
            response_timeout,
            closed: false,
        };
        channel.send(&ClientMessage::Start).await?;
        Ok(channel)
    }

    async fn send(&mut self, message: &ClientMessage) -> Result<()> {
        let text = serde_json::to_string(message)?;
        self.socket
            .send(Message::Text(text))
            .await
            .map_err(|e| Error::Channel(e.to_string()))
    }

    async fn next_verdict(&mut self) -> Result<VideoVerdict> {
        loop {
            let message = match self.socket.next().await {
                Some(Ok(message)) => message,
                Some(Err(e)) => return Err(Error::Channel(e.to_string())),
                None => return Err(Error::Channel("analysis server hung up".to_string())),
            };

            let text = match message {
                Message::Text(text) => text,
                Message::Close(_) => {
                    self.closed = true;
                    return Err(Error::Channel("analysis server closed the stream".to_string()));
                }
                _ => continue,
            };

            match serde_json::from_str::<ServerMessage>(&text) {
                Ok(ServerMessage::Result(verdict)) => return Ok(verdict),
                Ok(ServerMessage::Connected { message }) => {
                    debug!(greeting = message.as_deref().unwrap_or(""), "Analysis server ready");
                }
                Ok(ServerMessage::Error { message }) => {
                    return Err(Error::Channel(
                        message.unwrap_or_else(|| "Error analyzing video".to_string()),
                    ));
                }
                Err(e) => debug!(error = %e, "Ignoring unrecognised analysis message"),
            }
        }
    }
}

#[async_trait]
impl AnalysisChannel for RemoteChannel {
    fn mode(&self) -> ChannelMode {
        ChannelMode::Remote
    }

    async fn analyze(&mut self, frame: &Frame) -> Result<VideoVerdict> {
        self.send(&ClientMessage::Frame {
            frame: frame.index,
            data: BASE64.encode(&frame.jpeg),
        })
        .await?;

        let timeout = self.response_timeout;
        tokio::time::timeout(timeout, self.next_verdict())
            .await
            .map_err(|_| {
                Error::Channel(format!("no verdict within {}ms", timeout.as_millis()))
            })?
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.send(&ClientMessage::Stop).await?;
        self.socket
            .close(None)
            .await
            .map_err(|e| Error::Channel(e.to_string()))
    }
}
