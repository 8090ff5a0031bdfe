//! Request Parser
//!
//! This module decodes one request from a raw read buffer into a [`Command`].
//!
//! ## Grammar
//!
//! ```text
//! Array       := "*" <decimal n, n > 0> LINE_END n × BulkString
//! BulkString  := "$" <decimal len> LINE_END <len raw bytes> LINE_END
//! LINE_END    := CRLF | the four characters `\r\n`
//! ```
//!
//! The escaped form of the line end is accepted for clients that send the
//! escape text instead of the control bytes.
//!
//! ## How the Parser Works
//!
//! 1. The array frame is decoded into its bulk string arguments.
//! 2. The arguments are offered to each command shape in a fixed order:
//!    ECHO, PING, SET, GET. The first shape that matches completely wins.
//! 3. Any failure along the way collapses into `Command::Error(UnknownCommand)`.
//!
//! Parsing never blocks and never touches the store. The input is a single
//! read, so an incomplete frame is an error, not a request for more data.
//! Only the first command in the buffer is decoded; bytes after it are left
//! unread and the consumed length is reported so callers can log the rest.

use crate::protocol::types::{prefix, Command, UnknownCommand};
use bytes::Bytes;
use thiserror::Error;
use tracing::debug;

/// Why a request was rejected.
///
/// These never reach the client; every variant is answered with the same
/// unknown-command error.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    /// The input buffer is empty
    #[error("empty input")]
    EmptyInput,

    /// A frame did not start with the expected type prefix
    #[error("expected {expected:?} but found {found:?}")]
    UnexpectedPrefix { expected: char, found: char },

    /// A length or count was not a non-negative decimal integer
    #[error("invalid length: {0}")]
    InvalidLength(String),

    /// The array declared zero elements
    #[error("empty array")]
    EmptyArray,

    /// A line terminator was missing where one was required
    #[error("missing line end at offset {0}")]
    MissingLineEnd(usize),

    /// The buffer ended before the frame did
    #[error("truncated input: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    /// The arguments did not match any known command shape
    #[error("no command matches '{token}' with {arity} argument(s)")]
    NoMatchingCommand { token: String, arity: usize },
}

impl From<ParseError> for UnknownCommand {
    fn from(_: ParseError) -> Self {
        UnknownCommand
    }
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

const ESCAPED_LINE_END: &[u8] = b"\\r\\n";

/// A read position over the request buffer.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    fn expect_prefix(&mut self, expected: u8) -> ParseResult<()> {
        match self.remaining().first() {
            Some(&b) if b == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(&b) => Err(ParseError::UnexpectedPrefix {
                expected: expected as char,
                found: b as char,
            }),
            None => Err(ParseError::Truncated {
                needed: self.pos + 1,
                available: self.buf.len(),
            }),
        }
    }

    /// Consumes a CRLF or its escaped spelling.
    fn expect_line_end(&mut self) -> ParseResult<()> {
        let rest = self.remaining();
        if rest.starts_with(b"\r\n") {
            self.pos += 2;
            Ok(())
        } else if rest.starts_with(ESCAPED_LINE_END) {
            self.pos += ESCAPED_LINE_END.len();
            Ok(())
        } else {
            Err(ParseError::MissingLineEnd(self.pos))
        }
    }

    /// Reads an unsigned decimal followed by a line end.
    ///
    /// Signs are rejected, which also rules out the `-1` null forms.
    fn read_length(&mut self) -> ParseResult<usize> {
        let digits = self
            .remaining()
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        let text = &self.remaining()[..digits];

        let length = parse_decimal(text).ok_or_else(|| {
            let shown = self
                .remaining()
                .iter()
                .take_while(|&&b| b != b'\r' && b != b'\\')
                .take(20)
                .copied()
                .collect::<Vec<u8>>();
            ParseError::InvalidLength(String::from_utf8_lossy(&shown).into_owned())
        })?;
        self.pos += digits;

        self.expect_line_end()?;
        usize::try_from(length).map_err(|_| ParseError::InvalidLength(length.to_string()))
    }

    fn take(&mut self, len: usize) -> ParseResult<&'a [u8]> {
        let needed = self.pos.saturating_add(len);
        if needed > self.buf.len() {
            return Err(ParseError::Truncated {
                needed,
                available: self.buf.len(),
            });
        }
        let data = &self.buf[self.pos..needed];
        self.pos = needed;
        Ok(data)
    }

    fn read_bulk_string(&mut self) -> ParseResult<Bytes> {
        self.expect_prefix(prefix::BULK_STRING)?;
        let len = self.read_length()?;
        let data = self.take(len)?;
        self.expect_line_end()?;
        Ok(Bytes::copy_from_slice(data))
    }

    fn read_array(&mut self) -> ParseResult<Vec<Bytes>> {
        self.expect_prefix(prefix::ARRAY)?;
        let count = self.read_length()?;
        if count == 0 {
            return Err(ParseError::EmptyArray);
        }

        // Each element needs at least four bytes, so a bogus count fails
        // on truncation long before the vector grows large.
        let mut args = Vec::with_capacity(count.min(8));
        for _ in 0..count {
            args.push(self.read_bulk_string()?);
        }
        Ok(args)
    }
}

/// Parses a string of ASCII digits. Empty input and overflow yield None.
fn parse_decimal(digits: &[u8]) -> Option<u64> {
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    digits.iter().try_fold(0u64, |acc, &d| {
        acc.checked_mul(10)?.checked_add(u64::from(d - b'0'))
    })
}

fn token_is(arg: &Bytes, token: &str) -> bool {
    arg.eq_ignore_ascii_case(token.as_bytes())
}

/// One command shape: returns the command if `args` match it completely.
type Alternative = fn(&[Bytes]) -> Option<Command>;

/// Tried in this order; the first full match wins.
const ALTERNATIVES: [Alternative; 4] = [match_echo, match_ping, match_set, match_get];

fn match_echo(args: &[Bytes]) -> Option<Command> {
    match args {
        [cmd, message] if token_is(cmd, "ECHO") => Some(Command::Echo(message.clone())),
        _ => None,
    }
}

fn match_ping(args: &[Bytes]) -> Option<Command> {
    match args {
        [cmd] if token_is(cmd, "PING") => Some(Command::Ping),
        _ => None,
    }
}

fn match_set(args: &[Bytes]) -> Option<Command> {
    match args {
        [cmd, key, value] if token_is(cmd, "SET") => Some(Command::Set {
            key: key.clone(),
            value: value.clone(),
            ttl_ms: None,
        }),
        [cmd, key, value, option, ttl] if token_is(cmd, "SET") && token_is(option, "PX") => {
            Some(Command::Set {
                key: key.clone(),
                value: value.clone(),
                ttl_ms: Some(parse_decimal(ttl)?),
            })
        }
        _ => None,
    }
}

fn match_get(args: &[Bytes]) -> Option<Command> {
    match args {
        [cmd, key] if token_is(cmd, "GET") => Some(Command::Get(key.clone())),
        _ => None,
    }
}

/// Decodes requests into commands.
///
/// # Example
///
/// ```
/// use emberkv::protocol::{Command, RequestParser};
///
/// let parser = RequestParser::new();
/// let command = parser.parse(b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n");
/// assert_eq!(command, Command::Get("name".into()));
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestParser;

impl RequestParser {
    /// Creates a new parser instance.
    pub fn new() -> Self {
        Self
    }

    /// Decodes the first command in `buf`.
    ///
    /// # Returns
    ///
    /// - `Ok((command, consumed))` - a recognized command and the bytes it spanned
    /// - `Err(e)` - why the request was rejected
    ///
    /// `command` is never `Command::Error`; failures are reported through `Err`.
    pub fn try_parse(&self, buf: &[u8]) -> ParseResult<(Command, usize)> {
        if buf.is_empty() {
            return Err(ParseError::EmptyInput);
        }

        let mut cursor = Cursor::new(buf);
        let args = cursor.read_array()?;

        ALTERNATIVES
            .iter()
            .find_map(|alternative| alternative(&args))
            .map(|command| (command, cursor.pos))
            .ok_or_else(|| ParseError::NoMatchingCommand {
                token: String::from_utf8_lossy(&args[0]).into_owned(),
                arity: args.len(),
            })
    }

    /// Decodes the first command in `buf`, collapsing every failure into
    /// `Command::Error(UnknownCommand)`.
    pub fn parse(&self, buf: &[u8]) -> Command {
        match self.try_parse(buf) {
            Ok((command, _)) => command,
            Err(e) => {
                debug!(reason = %e, "Rejected request");
                Command::Error(e.into())
            }
        }
    }
}

/// Helper function to decode a single request.
pub fn parse_request(buf: &[u8]) -> Command {
    RequestParser::new().parse(buf)
}
