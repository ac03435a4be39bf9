//! WebSocket transport over tokio-tungstenite

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::{Connection, ConnectionTransport, Frame, FrameSink, FrameStream, TransportError};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connects with `tokio_tungstenite::connect_async`
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ConnectionTransport for WebSocketTransport {
    async fn connect(&self, url: &str) -> Result<Connection, TransportError> {
        let (socket, response) =
            tokio_tungstenite::connect_async(url)
                .await
                .map_err(|e| TransportError::Connect {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;

        tracing::debug!(url = %url, status = %response.status(), "WebSocket connected");

        let (sink, stream) = socket.split();
        Ok((Box::new(WsSink { sink }), Box::new(WsStream { stream })))
    }
}

struct WsSink {
    sink: SplitSink<Socket, Message>,
}

#[async_trait]
impl FrameSink for WsSink {
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        let message = match frame {
            Frame::Text(text) => Message::Text(text),
            Frame::Binary(bytes) => Message::Binary(bytes),
            Frame::Close { code, reason } => Message::Close(code.map(|code| CloseFrame {
                code: WsCloseCode::from(code),
                reason: reason.into(),
            })),
        };
        self.sink.send(message).await?;
        Ok(())
    }
}

struct WsStream {
    stream: SplitStream<Socket>,
}

#[async_trait]
impl FrameStream for WsStream {
    async fn next_frame(&mut self) -> Option<Result<Frame, TransportError>> {
        loop {
            let message = match self.stream.next().await? {
                Ok(message) => message,
                Err(e) => return Some(Err(e.into())),
            };

            let frame = match message {
                Message::Text(text) => Frame::Text(text),
                Message::Binary(bytes) => Frame::Binary(bytes),
                Message::Close(close) => match close {
                    Some(close) => Frame::Close {
                        code: Some(u16::from(close.code)),
                        reason: close.reason.into_owned(),
                    },
                    None => Frame::Close {
                        code: None,
                        reason: String::new(),
                    },
                },
                // Pongs are answered by tungstenite itself
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            };
            return Some(Ok(frame));
        }
    }
}
