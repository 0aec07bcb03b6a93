use bytes::{Buf, BytesMut};
use std::io::{self, Cursor};
use thiserror::Error as ThisError;
use tokio_util::codec::{Decoder, Encoder};

use crate::frame::{self, Scanner, SerializeError};
use crate::message::Message;

/// Default upper bound for a single buffered frame, 512 MiB like Redis' `proto-max-bulk-len`.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 512 * 1024 * 1024;

#[derive(Debug, ThisError)]
pub enum CodecError {
    #[error(transparent)]
    Frame(#[from] frame::Error),
    #[error(transparent)]
    Serialize(#[from] SerializeError),
    #[error("frame size exceeds limit of {0} bytes")]
    FrameTooLarge(usize),
    #[error("connection closed in the middle of a frame")]
    UnexpectedEof,
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Turns a byte stream into [`Message`]s and back.
///
/// Bytes are accumulated until a whole frame is available; a frame split across several reads
/// is only yielded once its last byte arrives. Completeness is checked incrementally by a
/// [`Scanner`], and the message is built once, from the complete frame.
#[derive(Debug, Clone)]
pub struct MessageCodec {
    max_frame_size: usize,
    scanner: Scanner,
}

impl MessageCodec {
    pub fn new(max_frame_size: usize) -> MessageCodec {
        MessageCodec {
            max_frame_size,
            scanner: Scanner::new(),
        }
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl Default for MessageCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}

impl Decoder for MessageCodec {
    type Item = Message;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        let length = match self.scanner.check(&src[..]) {
            Ok(length) => length,
            // Not enough data to parse a frame, unless the client is flooding us.
            Err(frame::Error::Incomplete) if src.len() > self.max_frame_size => {
                self.scanner.reset();
                return Err(CodecError::FrameTooLarge(self.max_frame_size));
            }
            Err(frame::Error::Incomplete) => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let mut cursor = Cursor::new(&src[..length]);
        let message = Message::parse(&mut cursor)?;

        // Remove the parsed frame from the buffer.
        src.advance(length);

        Ok(Some(message))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(message) => Ok(Some(message)),
            None if src.is_empty() => Ok(None),
            None => Err(CodecError::UnexpectedEof),
        }
    }
}

impl Encoder<Message> for MessageCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        // Serialize aside so a rejected message never leaves half a frame in the write buffer.
        let bytes = item.serialize()?;
        dst.extend_from_slice(&bytes);
        Ok(())
    }
}
