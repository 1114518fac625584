//! Blocking memcached ASCII protocol client.
//!
//! `Client` wraps a [`Transport`] and provides typed command methods.
//! Encoding and parsing live in the `mctext-protocol` crate; this crate
//! composes them with a transport collaborator that moves bytes to and
//! from the server.
//!
//! All key and value parameters accept `impl AsRef<[u8]>`, so you can
//! pass `&str`, `String`, `&[u8]`, `Vec<u8>`, `Bytes`, etc.
//!
//! The protocol is strictly request/response over a single connection,
//! with one in-flight request at a time. The client holds no internal
//! locking: concurrent callers must serialize access externally, e.g.
//! one client per connection or an external mutex. Nothing is retried
//! or reconnected here; timeouts belong to the transport.
//!
//! # Example
//!
//! ```no_run
//! use mctext::{Client, TcpConfig, TcpTransport};
//!
//! fn example() -> Result<(), mctext::Error> {
//!     let transport = TcpTransport::connect("127.0.0.1:11211", &TcpConfig::default())?;
//!     let mut client = Client::new(transport);
//!     client.set("hello", "world")?;
//!     let val = client.get("hello")?;
//!     assert_eq!(val.unwrap().data.as_ref(), b"world");
//!     Ok(())
//! }
//! ```

pub mod instrumented;
mod transport;

pub use instrumented::{CommandResult, CommandType, InstrumentedClient};
pub use transport::{TcpConfig, TcpTransport, Transport};

use std::io;

use bytes::Bytes;
use mctext_protocol::{
    StorageCommand, classify_error, decr_command, delete_command, flush_all_command, get_command,
    gets_command, incr_command, parse_delete, parse_fetch, parse_numeric, parse_ok, parse_touch,
    parse_version, storage_result, touch_command, version_command,
};

// -- Error -------------------------------------------------------------------

/// Errors returned by the client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Protocol-level failure, or a storage outcome such as
    /// [`NotStored`](mctext_protocol::Error::NotStored).
    #[error(transparent)]
    Protocol(#[from] mctext_protocol::Error),

    /// I/O failure in the transport collaborator, passed through
    /// unmodified.
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),
}

// -- Value types -------------------------------------------------------------

/// A value returned from a single-key `get`.
#[derive(Debug, Clone)]
pub struct Value {
    /// The cached data.
    pub data: Bytes,
    /// Flags stored with the item.
    pub flags: u32,
}

/// A value returned from a multi-key `gets`, including the key.
#[derive(Debug, Clone)]
pub struct GetValue {
    /// The key for this value.
    pub key: Bytes,
    /// The cached data.
    pub data: Bytes,
    /// Flags stored with the item.
    pub flags: u32,
    /// CAS token, when the server returned one.
    pub cas: Option<u64>,
}

// -- Client ------------------------------------------------------------------

/// A memcached client over a single [`Transport`].
pub struct Client<T: Transport> {
    transport: T,
}

impl<T: Transport> Client<T> {
    /// Create a client over an established transport.
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Consume the client, returning the transport.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Send wire bytes and run the generic error classifier on the raw
    /// response before any command-specific parsing.
    fn exchange(&mut self, command: &[u8], payload: Option<&[u8]>) -> Result<Vec<u8>, Error> {
        let raw = self.transport.send(command, payload)?;
        if let Some(err) = classify_error(&raw) {
            return Err(err.into());
        }
        Ok(raw)
    }

    // -- Storage commands -----------------------------------------------------

    /// Run any storage command.
    ///
    /// The semantic outcomes surface as errors:
    /// [`NotStored`](mctext_protocol::Error::NotStored),
    /// [`Exists`](mctext_protocol::Error::Exists) and
    /// [`NotFound`](mctext_protocol::Error::NotFound).
    pub fn store(&mut self, cmd: &StorageCommand<'_>) -> Result<(), Error> {
        let (command, payload) = cmd.encode()?;
        let raw = self.exchange(&command, Some(&payload))?;
        storage_result(&raw)?;
        Ok(())
    }

    /// Store a key-value pair with default flags and no expiration.
    pub fn set(&mut self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Result<(), Error> {
        self.store(&StorageCommand::set(key.as_ref(), value.as_ref()))
    }

    /// Store a key-value pair with explicit flags and expiration time.
    pub fn set_with_options(
        &mut self,
        key: impl AsRef<[u8]>,
        value: impl AsRef<[u8]>,
        flags: u32,
        exptime: i32,
    ) -> Result<(), Error> {
        self.store(
            &StorageCommand::set(key.as_ref(), value.as_ref())
                .flags(flags)
                .exptime(exptime),
        )
    }

    /// Store only if the key does not already exist.
    pub fn add(&mut self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Result<(), Error> {
        self.store(&StorageCommand::add(key.as_ref(), value.as_ref()))
    }

    /// Store only if the key already exists.
    pub fn replace(&mut self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Result<(), Error> {
        self.store(&StorageCommand::replace(key.as_ref(), value.as_ref()))
    }

    /// Append data to an existing item's value.
    pub fn append(&mut self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Result<(), Error> {
        self.store(&StorageCommand::append(key.as_ref(), value.as_ref()))
    }

    /// Prepend data to an existing item's value.
    pub fn prepend(&mut self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Result<(), Error> {
        self.store(&StorageCommand::prepend(key.as_ref(), value.as_ref()))
    }

    /// Check-and-set: store only if the item is unchanged since the CAS
    /// token was fetched via [`gets`](Self::gets).
    pub fn cas(
        &mut self,
        key: impl AsRef<[u8]>,
        value: impl AsRef<[u8]>,
        cas_unique: u64,
    ) -> Result<(), Error> {
        self.store(&StorageCommand::cas(key.as_ref(), value.as_ref(), cas_unique))
    }

    // -- Fetch commands -------------------------------------------------------

    /// Get the value of a key. A missing key yields `None`, which is
    /// distinct from a stored zero-length value.
    pub fn get(&mut self, key: impl AsRef<[u8]>) -> Result<Option<Value>, Error> {
        let command = get_command(key.as_ref())?;
        let raw = self.exchange(&command, None)?;
        let mut values = parse_fetch(&raw)?;
        if values.is_empty() {
            Ok(None)
        } else {
            let v = values.swap_remove(0);
            Ok(Some(Value {
                data: Bytes::from(v.data),
                flags: v.flags,
            }))
        }
    }

    /// Get values for multiple keys, with CAS tokens.
    ///
    /// Only hits are returned, in server-chosen order; callers must not
    /// assume request order.
    pub fn gets(&mut self, keys: &[&[u8]]) -> Result<Vec<GetValue>, Error> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let command = gets_command(keys)?;
        let raw = self.exchange(&command, None)?;
        Ok(parse_fetch(&raw)?
            .into_iter()
            .map(|v| GetValue {
                key: Bytes::from(v.key),
                data: Bytes::from(v.data),
                flags: v.flags,
                cas: v.cas,
            })
            .collect())
    }

    // -- Single-line commands -------------------------------------------------

    /// Delete a key. Returns `true` if deleted, `false` if not found.
    pub fn delete(&mut self, key: impl AsRef<[u8]>) -> Result<bool, Error> {
        let command = delete_command(key.as_ref())?;
        let raw = self.exchange(&command, None)?;
        Ok(parse_delete(&raw)?)
    }

    /// Increment a numeric value. Returns the new value, or `None` if
    /// the key does not exist.
    pub fn incr(&mut self, key: impl AsRef<[u8]>, delta: u64) -> Result<Option<u64>, Error> {
        let command = incr_command(key.as_ref(), delta)?;
        let raw = self.exchange(&command, None)?;
        Ok(parse_numeric(&raw)?)
    }

    /// Decrement a numeric value. Returns the new value, or `None` if
    /// the key does not exist.
    pub fn decr(&mut self, key: impl AsRef<[u8]>, delta: u64) -> Result<Option<u64>, Error> {
        let command = decr_command(key.as_ref(), delta)?;
        let raw = self.exchange(&command, None)?;
        Ok(parse_numeric(&raw)?)
    }

    /// Update an item's expiration time without touching its value.
    /// Returns `true` if the key existed.
    pub fn touch(&mut self, key: impl AsRef<[u8]>, exptime: i32) -> Result<bool, Error> {
        let command = touch_command(key.as_ref(), exptime)?;
        let raw = self.exchange(&command, None)?;
        Ok(parse_touch(&raw)?)
    }

    /// Flush all items from the cache.
    pub fn flush_all(&mut self) -> Result<(), Error> {
        let raw = self.exchange(&flush_all_command(), None)?;
        Ok(parse_ok(&raw)?)
    }

    /// Get the server version string.
    pub fn version(&mut self) -> Result<String, Error> {
        let raw = self.exchange(&version_command(), None)?;
        Ok(parse_version(&raw)?)
    }
}
