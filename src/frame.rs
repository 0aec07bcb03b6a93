// https://redis.io/docs/reference/protocol-spec

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;
use std::str;
use thiserror::Error as ThisError;

use crate::message::Message;

static CRLF: &[u8; 2] = b"\r\n";

/// Deepest array nesting a frame may have. Parsing recurses once per level.
pub const MAX_NESTING_DEPTH: usize = 512;

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum Error {
    #[error("not enough data is available to parse an entire frame")]
    Incomplete,
    #[error("invalid message type: {}", marker(.0))]
    InvalidDataType(u8),
    #[error("invalid integer format: {0}")]
    InvalidInteger(String),
    #[error("invalid length: {0}")]
    InvalidLength(String),
    #[error("invalid length: {0}")]
    NegativeLength(i64),
    #[error("line not terminated with CRLF")]
    MissingCrlf,
    #[error("protocol error; invalid frame format")]
    InvalidUtf8,
    #[error("arrays nested deeper than {} levels", MAX_NESTING_DEPTH)]
    NestingTooDeep,
    #[error("failed to parse array element {index}: {source}")]
    Element {
        index: usize,
        #[source]
        source: Box<Error>,
    },
}

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum SerializeError {
    #[error("{0} cannot contain CR or LF characters")]
    ContainsCrlf(&'static str),
    #[error("failed to serialize array element {index}: {source}")]
    Element {
        index: usize,
        #[source]
        source: Box<SerializeError>,
    },
}

// Protocol specification: https://redis.io/docs/reference/protocol-spec/
impl Message {
    /// Parses exactly one frame starting at the cursor position. On success the cursor is left
    /// at the first byte of the next frame. `Error::Incomplete` means the buffer ends before the
    /// frame does; callers holding a growing buffer should retry once more bytes arrive, or
    /// use a [`Scanner`] to find out when the frame is complete.
    pub fn parse(src: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        Self::parse_at_depth(src, 0)
    }

    fn parse_at_depth(src: &mut Cursor<&[u8]>, depth: usize) -> Result<Self, Error> {
        // The first byte in an RESP-serialized payload always identifies its type.
        // Subsequent bytes constitute the type's contents.
        let first_byte = get_byte(src)?;
        let data_type = DataType::try_from(first_byte)?;

        match data_type {
            DataType::SimpleString => {
                let line = get_line(src)?;
                Ok(Message::Simple(to_str(line)?.to_string()))
            }
            DataType::SimpleError => {
                let line = get_line(src)?;
                Ok(Message::Error(to_str(line)?.to_string()))
            }
            DataType::Integer => {
                let integer = get_integer(src)?;
                Ok(Message::Integer(integer))
            }
            // $<length>\r\n<data>\r\n
            DataType::BulkString => match get_length(src)? {
                Some(length) => {
                    let data = get_bulk(src, length)?;
                    Ok(Message::Bulk(Some(Bytes::copy_from_slice(data))))
                }
                None => Ok(Message::null_bulk()),
            },
            // *<number-of-elements>\r\n<element-1>...<element-n>
            DataType::Array => {
                if depth >= MAX_NESTING_DEPTH {
                    return Err(Error::NestingTooDeep);
                }

                let length = match get_length(src)? {
                    Some(length) => length,
                    None => return Ok(Message::null_array()),
                };

                // The declared length is untrusted, so it only hints the initial capacity.
                let mut elements = Vec::with_capacity(length.min(1024));
                for index in 0..length {
                    match Self::parse_at_depth(src, depth + 1) {
                        Ok(element) => elements.push(element),
                        Err(err @ (Error::Incomplete | Error::NestingTooDeep)) => return Err(err),
                        Err(err) => {
                            return Err(Error::Element {
                                index,
                                source: Box::new(err),
                            })
                        }
                    }
                }

                Ok(Message::Array(Some(elements)))
            }
        }
    }

    pub fn serialize(&self) -> Result<Vec<u8>, SerializeError> {
        let mut dst = BytesMut::new();
        self.write_to(&mut dst)?;
        Ok(dst.to_vec())
    }

    /// Appends the wire representation of the message to `dst`. On error `dst` may hold a
    /// partially written frame.
    pub fn write_to(&self, dst: &mut BytesMut) -> Result<(), SerializeError> {
        match self {
            Message::Simple(s) => {
                if contains_crlf(s) {
                    return Err(SerializeError::ContainsCrlf("simple string"));
                }
                write_line(dst, DataType::SimpleString, s.as_bytes());
            }
            Message::Error(s) => {
                if contains_crlf(s) {
                    return Err(SerializeError::ContainsCrlf("error message"));
                }
                write_line(dst, DataType::SimpleError, s.as_bytes());
            }
            Message::Integer(i) => {
                write_line(dst, DataType::Integer, i.to_string().as_bytes());
            }
            Message::Bulk(None) => dst.put_slice(b"$-1\r\n"),
            Message::Bulk(Some(data)) => {
                write_line(dst, DataType::BulkString, data.len().to_string().as_bytes());
                dst.put_slice(data);
                dst.put_slice(CRLF);
            }
            Message::Array(None) => dst.put_slice(b"*-1\r\n"),
            Message::Array(Some(elements)) => {
                write_line(dst, DataType::Array, elements.len().to_string().as_bytes());
                for (index, element) in elements.iter().enumerate() {
                    element.write_to(dst).map_err(|err| SerializeError::Element {
                        index,
                        source: Box::new(err),
                    })?;
                }
            }
        }

        Ok(())
    }
}

/// Checks whether a buffer holds a whole frame, without building it.
///
/// The scanner remembers how far it got, so a frame arriving in pieces is checked in time
/// linear to its size: every call resumes at the first element not yet fully buffered. The
/// buffer passed to consecutive calls must only grow at its end. A scanner is reset once it
/// reports a complete frame or an error.
#[derive(Debug, Clone, Default)]
pub struct Scanner {
    // Start of the first element not yet checked.
    offset: usize,
    // Elements still expected by every open array, innermost last.
    pending: Vec<usize>,
}

impl Scanner {
    pub fn new() -> Scanner {
        Self::default()
    }

    /// Returns the length of the frame at the start of `src` once all of it is buffered, and
    /// `Error::Incomplete` until then. Malformed input is reported as soon as it is seen.
    pub fn check(&mut self, src: &[u8]) -> Result<usize, Error> {
        let result = self.resume(src);
        if !matches!(result, Err(Error::Incomplete)) {
            self.reset();
        }
        result
    }

    pub fn reset(&mut self) {
        self.offset = 0;
        self.pending.clear();
    }

    fn resume(&mut self, src: &[u8]) -> Result<usize, Error> {
        loop {
            let mut cursor = Cursor::new(src);
            cursor.set_position(self.offset as u64);

            // Only whole elements move the offset, a partial one is checked again next time.
            let children = check_element(&mut cursor, self.pending.len())?;
            self.offset = cursor.position() as usize;

            if let Some(count) = children {
                self.pending.push(count);
                continue;
            }

            // The element is complete, and so is every array it was the last element of.
            loop {
                match self.pending.last_mut() {
                    None => return Ok(self.offset),
                    Some(remaining) if *remaining > 1 => {
                        *remaining -= 1;
                        break;
                    }
                    Some(_) => {
                        self.pending.pop();
                    }
                }
            }
        }
    }
}

/// Checks one element without descending into it. Returns the number of elements that follow
/// when it is a non-empty array header.
fn check_element(src: &mut Cursor<&[u8]>, depth: usize) -> Result<Option<usize>, Error> {
    match DataType::try_from(get_byte(src)?)? {
        DataType::SimpleString | DataType::SimpleError => {
            to_str(get_line(src)?)?;
        }
        DataType::Integer => {
            get_integer(src)?;
        }
        DataType::BulkString => {
            if let Some(length) = get_length(src)? {
                get_bulk(src, length)?;
            }
        }
        DataType::Array => {
            if depth >= MAX_NESTING_DEPTH {
                return Err(Error::NestingTooDeep);
            }
            return Ok(get_length(src)?.filter(|&count| count > 0));
        }
    }

    Ok(None)
}

fn marker(byte: &u8) -> char {
    char::from(*byte)
}

fn contains_crlf(s: &str) -> bool {
    s.contains(['\r', '\n'])
}

fn write_line(dst: &mut BytesMut, data_type: DataType, line: &[u8]) {
    dst.reserve(1 + line.len() + CRLF.len());
    dst.put_u8(u8::from(data_type));
    dst.put_slice(line);
    dst.put_slice(CRLF);
}

/// Reads up to and including the next `\n`, which must be preceded by `\r`. Returns the line
/// without its terminator.
fn get_line<'a>(src: &mut Cursor<&'a [u8]>) -> Result<&'a [u8], Error> {
    let start = src.position() as usize;
    let buf = *src.get_ref();

    let newline = buf[start..]
        .iter()
        .position(|&b| b == b'\n')
        .map(|index| start + index)
        .ok_or(Error::Incomplete)?;

    if newline == start || buf[newline - 1] != b'\r' {
        return Err(Error::MissingCrlf);
    }

    src.set_position((newline + 1) as u64);

    Ok(&buf[start..newline - 1])
}

fn get_integer(src: &mut Cursor<&[u8]>) -> Result<i64, Error> {
    let line = to_str(get_line(src)?)?;
    line.parse::<i64>().map_err(|_| Error::InvalidInteger(line.to_string()))
}

/// Reads a bulk string or array length header. `None` stands for the `-1` null marker.
fn get_length(src: &mut Cursor<&[u8]>) -> Result<Option<usize>, Error> {
    let line = to_str(get_line(src)?)?;
    let length = line
        .parse::<i64>()
        .map_err(|_| Error::InvalidLength(line.to_string()))?;

    match length {
        -1 => Ok(None),
        length if length < -1 => Err(Error::NegativeLength(length)),
        length => usize::try_from(length)
            .map(Some)
            .map_err(|_| Error::InvalidLength(length.to_string())),
    }
}

/// Reads a bulk string payload of `length` bytes and its terminator. The payload is taken by
/// its declared length, it may itself contain CRLF.
fn get_bulk<'a>(src: &mut Cursor<&'a [u8]>, length: usize) -> Result<&'a [u8], Error> {
    if src.remaining() < length + CRLF.len() {
        return Err(Error::Incomplete);
    }

    let start = src.position() as usize;
    let end = start + length;
    let buf = *src.get_ref();
    if &buf[end..end + CRLF.len()] != CRLF {
        return Err(Error::MissingCrlf);
    }

    src.set_position((end + CRLF.len()) as u64);

    Ok(&buf[start..end])
}

fn get_byte(src: &mut Cursor<&[u8]>) -> Result<u8, Error> {
    if !src.has_remaining() {
        return Err(Error::Incomplete);
    }
    Ok(src.get_u8())
}

fn to_str(bytes: &[u8]) -> Result<&str, Error> {
    str::from_utf8(bytes).map_err(|_| Error::InvalidUtf8)
}

#[derive(Debug, Clone, Copy)]
enum DataType {
    SimpleString, // '+'
    SimpleError,  // '-'
    Integer,      // ':'
    BulkString,   // '$'
    Array,        // '*'
}

impl TryFrom<u8> for DataType {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            b'+' => Ok(Self::SimpleString),
            b'-' => Ok(Self::SimpleError),
            b':' => Ok(Self::Integer),
            b'$' => Ok(Self::BulkString),
            b'*' => Ok(Self::Array),
            _ => Err(Error::InvalidDataType(byte)),
        }
    }
}

impl From<DataType> for u8 {
    fn from(value: DataType) -> Self {
        match value {
            DataType::SimpleString => b'+',
            DataType::SimpleError => b'-',
            DataType::Integer => b':',
            DataType::BulkString => b'$',
            DataType::Array => b'*',
        }
    }
}
