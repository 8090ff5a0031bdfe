//! Commands and Responses
//!
//! This module defines what a request decodes into ([`Command`]) and what the
//! server answers with ([`Response`]), along with the response encoder.
//!
//! ## Response Wire Format
//!
//! - Payload: `+<payload>\r\n` (simple string framing)
//! - Nil: `$-1\r\n` (null bulk string)
//! - Error: `-ERR unknown command\r\n`
//!
//! Errors are framed with `-` only. They are not passed through the generic
//! `+` framing, so there is no doubly-marked `+-ERR ...` reply.

use bytes::Bytes;
use std::fmt;

/// The CRLF terminator used in RESP protocol
pub const CRLF: &[u8] = b"\r\n";

/// RESP protocol type prefixes
pub mod prefix {
    pub const SIMPLE_STRING: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// Message sent for every request that fails to parse.
pub const UNKNOWN_COMMAND_MESSAGE: &str = "ERR unknown command";

/// The single failure a request can decode into.
///
/// Malformed framing, bad lengths, wrong arity, an unrecognized token and an
/// invalid TTL all end up here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownCommand;

impl fmt::Display for UnknownCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(UNKNOWN_COMMAND_MESSAGE)
    }
}

/// A fully decoded request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `PING`
    Ping,
    /// `ECHO message`
    Echo(Bytes),
    /// `SET key value [PX milliseconds]`
    Set {
        key: Bytes,
        value: Bytes,
        ttl_ms: Option<u64>,
    },
    /// `GET key`
    Get(Bytes),
    /// Anything that did not parse
    Error(UnknownCommand),
}

impl Command {
    /// Command name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Ping => "PING",
            Command::Echo(_) => "ECHO",
            Command::Set { .. } => "SET",
            Command::Get(_) => "GET",
            Command::Error(_) => "UNKNOWN",
        }
    }
}

/// A reply to be sent back to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// A literal payload, sent verbatim inside simple string framing.
    Payload(Bytes),
    /// The null reply.
    Nil,
    /// An error reply.
    Error(&'static str),
}

impl Response {
    /// Creates a payload response.
    ///
    /// # Example
    /// ```
    /// use emberkv::protocol::types::Response;
    /// let reply = Response::payload("hello");
    /// assert_eq!(reply.serialize(), b"+hello\r\n");
    /// ```
    pub fn payload(data: impl Into<Bytes>) -> Self {
        Response::Payload(data.into())
    }

    /// Common response for successful operations
    pub fn ok() -> Self {
        Response::Payload(Bytes::from_static(b"OK"))
    }

    /// Common response for PONG
    pub fn pong() -> Self {
        Response::Payload(Bytes::from_static(b"PONG"))
    }

    pub fn unknown_command() -> Self {
        Response::Error(UNKNOWN_COMMAND_MESSAGE)
    }

    /// Serializes the response to bytes for sending over the wire.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.serialize_into(&mut buf);
        buf
    }

    /// Serializes the response into an existing buffer.
    ///
    /// Payload bytes are copied as-is; binary content and embedded CR/LF are
    /// not escaped.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        match self {
            Response::Payload(data) => {
                buf.push(prefix::SIMPLE_STRING);
                buf.extend_from_slice(data);
                buf.extend_from_slice(CRLF);
            }
            Response::Nil => {
                buf.push(prefix::BULK_STRING);
                buf.extend_from_slice(b"-1");
                buf.extend_from_slice(CRLF);
            }
            Response::Error(message) => {
                buf.push(prefix::ERROR);
                buf.extend_from_slice(message.as_bytes());
                buf.extend_from_slice(CRLF);
            }
        }
    }

    fn encoded_len(&self) -> usize {
        match self {
            Response::Payload(data) => 1 + data.len() + 2,
            Response::Nil => 5,
            Response::Error(message) => 1 + message.len() + 2,
        }
    }

    /// Returns true if this is the null reply.
    pub fn is_nil(&self) -> bool {
        matches!(self, Response::Nil)
    }

    /// Returns true if this is an error reply.
    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error(_))
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Payload(data) => match std::str::from_utf8(data) {
                Ok(s) => write!(f, "\"{}\"", s),
                Err(_) => write!(f, "(binary data, {} bytes)", data.len()),
            },
            Response::Nil => write!(f, "(nil)"),
            Response::Error(message) => write!(f, "(error) {}", message),
        }
    }
}

/// Frames `args` as a request: an array of bulk strings.
///
/// # Example
/// ```
/// use emberkv::protocol::frame_request;
/// assert_eq!(frame_request(&[b"GET", b"k"]), b"*2\r\n$3\r\nGET\r\n$1\r\nk\r\n");
/// ```
pub fn frame_request(args: &[&[u8]]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.push(prefix::ARRAY);
    buf.extend_from_slice(args.len().to_string().as_bytes());
    buf.extend_from_slice(CRLF);
    for arg in args {
        buf.push(prefix::BULK_STRING);
        buf.extend_from_slice(arg.len().to_string().as_bytes());
        buf.extend_from_slice(CRLF);
        buf.extend_from_slice(arg);
        buf.extend_from_slice(CRLF);
    }
    buf
}
