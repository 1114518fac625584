//! Wire encoding/decoding for the memcached ASCII protocol.
//!
//! This is the pure protocol layer of mctext: it builds command bytes,
//! interprets raw response bytes, and performs no I/O. The client crate
//! (`mctext`) composes it with a transport.
//!
//! # Example
//!
//! ```
//! use mctext_protocol::{StorageCommand, parse_fetch, storage_result};
//!
//! // encode a SET
//! let (command, payload) = StorageCommand::set(b"mykey", b"hello").encode().unwrap();
//! assert_eq!(command, b"set mykey 123456 0 5\r\n");
//! assert_eq!(payload, b"hello\r\n");
//!
//! // classify its response
//! assert!(storage_result(b"STORED\r\n").is_ok());
//!
//! // parse a fetch response
//! let values = parse_fetch(b"VALUE mykey 123456 5\r\nhello\r\nEND\r\n").unwrap();
//! assert_eq!(values[0].data, b"hello");
//! ```

mod error;
mod request;
mod response;

pub use error::Error;
pub use request::{
    DEFAULT_FLAGS, MAX_KEY_LEN, StorageCommand, StorageVerb, decr_command, delete_command,
    flush_all_command, get_command, gets_command, incr_command, touch_command, version_command,
};
pub use response::{
    Value, classify_error, frame_len, parse_delete, parse_fetch, parse_numeric, parse_ok,
    parse_touch, parse_version, storage_result,
};
