use std::fmt;

use bytes::Bytes;
use itertools::Itertools;
use strum_macros::Display;
use thiserror::Error as ThisError;

/// A single RESP value.
///
/// `Bulk` and `Array` carry an `Option` because RESP2 distinguishes a null bulk string
/// (`$-1\r\n`) and a null array (`*-1\r\n`) from their empty counterparts. The remaining
/// variants are never null.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Option<Bytes>),
    Array(Option<Vec<Message>>),
}

/// The variant of a [`Message`], without its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum MessageKind {
    SimpleString,
    Error,
    Integer,
    BulkString,
    Array,
}

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum TypeMismatch {
    #[error("message type {actual} cannot be converted to {expected}")]
    Kind {
        expected: &'static str,
        actual: MessageKind,
    },
    #[error("null {0}")]
    Null(MessageKind),
    #[error("bulk string is not valid UTF-8")]
    InvalidUtf8,
}

impl Message {
    pub fn simple(s: impl Into<String>) -> Message {
        Message::Simple(s.into())
    }

    pub fn error(s: impl Into<String>) -> Message {
        Message::Error(s.into())
    }

    pub fn integer(i: i64) -> Message {
        Message::Integer(i)
    }

    pub fn bulk(data: impl Into<Bytes>) -> Message {
        Message::Bulk(Some(data.into()))
    }

    pub fn null_bulk() -> Message {
        Message::Bulk(None)
    }

    pub fn array(elements: Vec<Message>) -> Message {
        Message::Array(Some(elements))
    }

    pub fn null_array() -> Message {
        Message::Array(None)
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Simple(_) => MessageKind::SimpleString,
            Message::Error(_) => MessageKind::Error,
            Message::Integer(_) => MessageKind::Integer,
            Message::Bulk(_) => MessageKind::BulkString,
            Message::Array(_) => MessageKind::Array,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Message::Bulk(None) | Message::Array(None))
    }

    /// Returns the textual payload of a simple string, error or non-null bulk string.
    pub fn as_str(&self) -> Result<&str, TypeMismatch> {
        match self {
            Message::Simple(s) | Message::Error(s) => Ok(s),
            Message::Bulk(Some(data)) => {
                std::str::from_utf8(data).map_err(|_| TypeMismatch::InvalidUtf8)
            }
            Message::Bulk(None) => Err(TypeMismatch::Null(MessageKind::BulkString)),
            message => Err(TypeMismatch::Kind {
                expected: "string",
                actual: message.kind(),
            }),
        }
    }

    /// Like [`Message::as_str`] but binary-safe for bulk strings.
    pub fn as_bytes(&self) -> Result<&[u8], TypeMismatch> {
        match self {
            Message::Simple(s) | Message::Error(s) => Ok(s.as_bytes()),
            Message::Bulk(Some(data)) => Ok(data),
            Message::Bulk(None) => Err(TypeMismatch::Null(MessageKind::BulkString)),
            message => Err(TypeMismatch::Kind {
                expected: "string",
                actual: message.kind(),
            }),
        }
    }

    pub fn as_integer(&self) -> Result<i64, TypeMismatch> {
        match self {
            Message::Integer(i) => Ok(*i),
            message => Err(TypeMismatch::Kind {
                expected: "integer",
                actual: message.kind(),
            }),
        }
    }

    pub fn as_array(&self) -> Result<&[Message], TypeMismatch> {
        match self {
            Message::Array(Some(elements)) => Ok(elements),
            Message::Array(None) => Err(TypeMismatch::Null(MessageKind::Array)),
            message => Err(TypeMismatch::Kind {
                expected: "array",
                actual: message.kind(),
            }),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Simple(s) => write!(f, "SimpleString({:?})", s),
            Message::Error(s) => write!(f, "Error({:?})", s),
            Message::Integer(i) => write!(f, "Integer({})", i),
            Message::Bulk(Some(data)) => {
                write!(f, "BulkString({:?})", String::from_utf8_lossy(data))
            }
            Message::Bulk(None) => write!(f, "BulkString(null)"),
            Message::Array(Some(elements)) => {
                write!(f, "Array[{}]", elements.iter().join(", "))
            }
            Message::Array(None) => write!(f, "Array(null)"),
        }
    }
}
