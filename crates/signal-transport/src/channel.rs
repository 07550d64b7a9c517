//! Full-duplex message channel handed to connection handlers.
//!
//! A `Channel` is the transport-neutral view of one upgraded connection.
//! The WebSocket adapter filters control frames (ping/pong are answered by
//! the WebSocket layer itself) so handlers only ever see payloads and close
//! signals.

use std::pin::Pin;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{Sink, SinkExt, Stream, StreamExt, future};

use crate::error::ChannelError;

/// Close code for an orderly close.
pub const NORMAL_CLOSURE: u16 = 1000;
/// Close code sent when the server is going away (shutdown).
pub const GOING_AWAY: u16 = 1001;

/// One unit of traffic on a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    /// Close signal, with the close code if the peer sent one.
    Close(Option<u16>),
}

impl Frame {
    pub fn is_close(&self) -> bool {
        matches!(self, Self::Close(_))
    }

    fn into_message(self) -> Message {
        match self {
            Self::Text(text) => Message::Text(text.into()),
            Self::Binary(data) => Message::Binary(data.into()),
            Self::Close(None) => Message::Close(None),
            Self::Close(Some(code)) => Message::Close(Some(CloseFrame {
                code,
                reason: String::new().into(),
            })),
        }
    }

    fn from_message(message: Message) -> Option<Self> {
        match message {
            Message::Text(text) => Some(Self::Text(text.as_str().to_owned())),
            Message::Binary(data) => Some(Self::Binary(data.to_vec())),
            Message::Close(frame) => Some(Self::Close(frame.map(|f| f.code))),
            Message::Ping(_) | Message::Pong(_) => None,
        }
    }
}

pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Frame, ChannelError>> + Send>>;
pub type FrameSink = Pin<Box<dyn Sink<Frame, Error = ChannelError> + Send>>;

/// Reader and writer halves of one connection.
pub struct Channel {
    reader: FrameStream,
    writer: FrameSink,
}

impl Channel {
    /// Build a channel from any frame stream and sink. Used by tests to
    /// drive handlers without a socket.
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: Stream<Item = Result<Frame, ChannelError>> + Send + 'static,
        W: Sink<Frame, Error = ChannelError> + Send + 'static,
    {
        Self {
            reader: Box::pin(reader),
            writer: Box::pin(writer),
        }
    }

    /// Adapt an upgraded axum WebSocket.
    pub fn from_websocket(socket: WebSocket) -> Self {
        let (sink, stream) = socket.split();

        let writer = sink
            .sink_map_err(|e| ChannelError::Write(Box::new(e)))
            .with(|frame: Frame| future::ready(Ok::<_, ChannelError>(frame.into_message())));

        let reader = stream.filter_map(|message| {
            future::ready(match message {
                Ok(message) => Frame::from_message(message).map(Ok),
                Err(e) => Some(Err(ChannelError::Read(Box::new(e)))),
            })
        });

        Self::new(reader, writer)
    }

    pub fn into_parts(self) -> (FrameStream, FrameSink) {
        (self.reader, self.writer)
    }
}
