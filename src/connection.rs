use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use uuid::Uuid;

use crate::codec::{CodecError, MessageCodec};
use crate::message::Message;

/// One client stream, framed into [`Message`]s.
pub struct Connection {
    pub id: Uuid,
    pub client_address: SocketAddr,
    // Data is read from the socket into the codec's read buffer. When a frame is parsed, the
    // corresponding data is removed from the buffer.
    framed: Framed<TcpStream, MessageCodec>,
}

impl Connection {
    pub fn new(stream: TcpStream, client_address: SocketAddr) -> Connection {
        Self::with_codec(stream, client_address, MessageCodec::default())
    }

    pub fn with_codec(
        stream: TcpStream,
        client_address: SocketAddr,
        codec: MessageCodec,
    ) -> Connection {
        Connection {
            id: Uuid::new_v4(),
            client_address,
            framed: Framed::new(stream, codec),
        }
    }

    /// Reads the next message. `Ok(None)` means the client closed the connection between two
    /// frames; closing it in the middle of one is an error.
    pub async fn read_message(&mut self) -> Result<Option<Message>, CodecError> {
        self.framed.next().await.transpose()
    }

    /// Writes a message and flushes it to the socket.
    pub async fn write_message(&mut self, message: Message) -> Result<(), CodecError> {
        self.framed.send(message).await
    }
}
