//! RESP Subset Protocol
//!
//! Requests arrive as an array of bulk strings and decode into a [`Command`].
//! Replies are a [`Response`], encoded as a simple string, a null bulk string,
//! or an error line.
//!
//! ## Modules
//!
//! - `types`: `Command`, `Response` and the response encoder
//! - `parser`: decoding of a read buffer into one `Command`
//!
//! ## Example
//!
//! ```
//! use emberkv::protocol::{parse_request, Command, Response};
//! use bytes::Bytes;
//!
//! let command = parse_request(b"*2\r\n$4\r\nECHO\r\n$2\r\nhi\r\n");
//! assert_eq!(command, Command::Echo(Bytes::from("hi")));
//!
//! let bytes = Response::payload("hi").serialize();
//! assert_eq!(bytes, b"+hi\r\n");
//! ```

pub mod parser;
pub mod types;

pub use parser::{parse_request, ParseError, ParseResult, RequestParser};
pub use types::{frame_request, Command, Response, UnknownCommand};
