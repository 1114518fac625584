//! Client-side command encoding for the memcached ASCII protocol.
//!
//! Storage commands encode to two lines:
//!
//! ```text
//! <verb> <key> <flags> <exptime> <bytes>[ <cas_unique>]\r\n
//! <data>\r\n
//! ```
//!
//! The `<bytes>` field is the exact byte length of the value, which is how
//! the server frames the payload: the value itself may contain any bytes,
//! including `\r\n`. Fetch and the other single-line commands are plain
//! space-separated lines.

use std::io::Write;

use crate::error::Error;

/// Flags value stamped on storage commands unless the caller overrides it.
pub const DEFAULT_FLAGS: u32 = 123456;

/// Maximum key size in bytes (memcached default is 250).
pub const MAX_KEY_LEN: usize = 250;

/// The six mutation commands sharing the storage wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageVerb {
    Set,
    Add,
    Replace,
    Append,
    Prepend,
    Cas,
}

impl StorageVerb {
    fn as_bytes(self) -> &'static [u8] {
        match self {
            StorageVerb::Set => b"set",
            StorageVerb::Add => b"add",
            StorageVerb::Replace => b"replace",
            StorageVerb::Append => b"append",
            StorageVerb::Prepend => b"prepend",
            StorageVerb::Cas => b"cas",
        }
    }
}

/// A fully-specified storage command.
///
/// The required key and value are constructor arguments; flags and
/// expiration carry defaults and can be overridden builder-style:
///
/// ```
/// use mctext_protocol::StorageCommand;
///
/// let (command, payload) = StorageCommand::set(b"greeting", b"hi")
///     .flags(0)
///     .exptime(3600)
///     .encode()
///     .unwrap();
/// assert_eq!(command, b"set greeting 0 3600 2\r\n");
/// assert_eq!(payload, b"hi\r\n");
/// ```
#[derive(Debug, Clone)]
pub struct StorageCommand<'a> {
    verb: StorageVerb,
    key: &'a [u8],
    value: &'a [u8],
    flags: u32,
    exptime: i32,
    cas_unique: Option<u64>,
}

impl<'a> StorageCommand<'a> {
    /// Create a storage command with default flags and no expiration.
    ///
    /// For [`StorageVerb::Cas`] the token must be supplied via
    /// [`cas_unique`](Self::cas_unique) (or use the [`cas`](Self::cas)
    /// constructor); encoding fails without it.
    pub fn new(verb: StorageVerb, key: &'a [u8], value: &'a [u8]) -> Self {
        Self {
            verb,
            key,
            value,
            flags: DEFAULT_FLAGS,
            exptime: 0,
            cas_unique: None,
        }
    }

    /// Create a SET command.
    #[inline]
    pub fn set(key: &'a [u8], value: &'a [u8]) -> Self {
        Self::new(StorageVerb::Set, key, value)
    }

    /// Create an ADD command (store only if the key does not exist).
    #[inline]
    pub fn add(key: &'a [u8], value: &'a [u8]) -> Self {
        Self::new(StorageVerb::Add, key, value)
    }

    /// Create a REPLACE command (store only if the key already exists).
    #[inline]
    pub fn replace(key: &'a [u8], value: &'a [u8]) -> Self {
        Self::new(StorageVerb::Replace, key, value)
    }

    /// Create an APPEND command.
    #[inline]
    pub fn append(key: &'a [u8], value: &'a [u8]) -> Self {
        Self::new(StorageVerb::Append, key, value)
    }

    /// Create a PREPEND command.
    #[inline]
    pub fn prepend(key: &'a [u8], value: &'a [u8]) -> Self {
        Self::new(StorageVerb::Prepend, key, value)
    }

    /// Create a CAS (check-and-set) command.
    #[inline]
    pub fn cas(key: &'a [u8], value: &'a [u8], cas_unique: u64) -> Self {
        Self::new(StorageVerb::Cas, key, value).cas_unique(cas_unique)
    }

    /// Set the flags value.
    #[inline]
    pub fn flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    /// Set the expiration time in seconds (0 = never; negative values
    /// expire the item immediately).
    #[inline]
    pub fn exptime(mut self, exptime: i32) -> Self {
        self.exptime = exptime;
        self
    }

    /// Set the CAS token.
    #[inline]
    pub fn cas_unique(mut self, cas_unique: u64) -> Self {
        self.cas_unique = Some(cas_unique);
        self
    }

    /// The verb this command encodes as.
    #[inline]
    pub fn verb(&self) -> StorageVerb {
        self.verb
    }

    /// Encode into the command line and the payload line.
    ///
    /// Validation failures (empty or invalid key, `cas` without a token)
    /// are reported here, before any bytes reach the wire.
    pub fn encode(&self) -> Result<(Vec<u8>, Vec<u8>), Error> {
        validate_key(self.key)?;
        if self.verb == StorageVerb::Cas && self.cas_unique.is_none() {
            return Err(Error::MissingArgument("cas_unique"));
        }

        let mut command = Vec::with_capacity(self.key.len() + 40);
        command.extend_from_slice(self.verb.as_bytes());
        command.push(b' ');
        command.extend_from_slice(self.key);
        write!(
            command,
            " {} {} {}",
            self.flags,
            self.exptime,
            self.value.len()
        )
        .unwrap();
        if let Some(cas_unique) = self.cas_unique {
            write!(command, " {cas_unique}").unwrap();
        }
        command.extend_from_slice(b"\r\n");

        let mut payload = Vec::with_capacity(self.value.len() + 2);
        payload.extend_from_slice(self.value);
        payload.extend_from_slice(b"\r\n");

        Ok((command, payload))
    }
}

/// Encode a GET command: `get <key>\r\n`
pub fn get_command(key: &[u8]) -> Result<Vec<u8>, Error> {
    single_key_command(b"get", key)
}

/// Encode a multi-key GETS command: `gets <key1> <key2> ...\r\n`
pub fn gets_command(keys: &[&[u8]]) -> Result<Vec<u8>, Error> {
    if keys.is_empty() {
        return Err(Error::MissingArgument("keys"));
    }
    let mut command = Vec::with_capacity(5 + keys.iter().map(|k| k.len() + 1).sum::<usize>());
    command.extend_from_slice(b"gets");
    for key in keys {
        validate_key(key)?;
        command.push(b' ');
        command.extend_from_slice(key);
    }
    command.extend_from_slice(b"\r\n");
    Ok(command)
}

/// Encode a DELETE command: `delete <key>\r\n`
pub fn delete_command(key: &[u8]) -> Result<Vec<u8>, Error> {
    single_key_command(b"delete", key)
}

/// Encode an INCR command: `incr <key> <delta>\r\n`
pub fn incr_command(key: &[u8], delta: u64) -> Result<Vec<u8>, Error> {
    counter_command(b"incr", key, delta)
}

/// Encode a DECR command: `decr <key> <delta>\r\n`
pub fn decr_command(key: &[u8], delta: u64) -> Result<Vec<u8>, Error> {
    counter_command(b"decr", key, delta)
}

/// Encode a TOUCH command: `touch <key> <exptime>\r\n`
pub fn touch_command(key: &[u8], exptime: i32) -> Result<Vec<u8>, Error> {
    validate_key(key)?;
    let mut command = Vec::with_capacity(key.len() + 20);
    command.extend_from_slice(b"touch ");
    command.extend_from_slice(key);
    write!(command, " {exptime}\r\n").unwrap();
    Ok(command)
}

/// Encode a FLUSH_ALL command: `flush_all\r\n`
pub fn flush_all_command() -> Vec<u8> {
    b"flush_all\r\n".to_vec()
}

/// Encode a VERSION command: `version\r\n`
pub fn version_command() -> Vec<u8> {
    b"version\r\n".to_vec()
}

fn single_key_command(verb: &[u8], key: &[u8]) -> Result<Vec<u8>, Error> {
    validate_key(key)?;
    let mut command = Vec::with_capacity(verb.len() + key.len() + 3);
    command.extend_from_slice(verb);
    command.push(b' ');
    command.extend_from_slice(key);
    command.extend_from_slice(b"\r\n");
    Ok(command)
}

fn counter_command(verb: &[u8], key: &[u8], delta: u64) -> Result<Vec<u8>, Error> {
    validate_key(key)?;
    let mut command = Vec::with_capacity(verb.len() + key.len() + 24);
    command.extend_from_slice(verb);
    command.push(b' ');
    command.extend_from_slice(key);
    write!(command, " {delta}\r\n").unwrap();
    Ok(command)
}

/// Keys go on the command line unquoted, so whitespace and control bytes
/// would corrupt the frame.
fn validate_key(key: &[u8]) -> Result<(), Error> {
    if key.is_empty() {
        return Err(Error::MissingArgument("key"));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(Error::InvalidKey);
    }
    if key.iter().any(|&b| b <= b' ' || b == 0x7f) {
        return Err(Error::InvalidKey);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_set_defaults() {
        let (command, payload) = StorageCommand::set(b"k", b"v").encode().unwrap();
        assert_eq!(command, b"set k 123456 0 1\r\n");
        assert_eq!(payload, b"v\r\n");
    }

    #[test]
    fn test_encode_set_with_options() {
        let (command, payload) = StorageCommand::set(b"mykey", b"myvalue")
            .flags(0)
            .exptime(3600)
            .encode()
            .unwrap();
        assert_eq!(command, b"set mykey 0 3600 7\r\n");
        assert_eq!(payload, b"myvalue\r\n");
    }

    #[test]
    fn test_encode_add_replace_append_prepend() {
        let cases: &[(StorageCommand, &[u8])] = &[
            (StorageCommand::add(b"k", b"abc"), b"add k 123456 0 3\r\n"),
            (StorageCommand::replace(b"k", b"abc"), b"replace k 123456 0 3\r\n"),
            (StorageCommand::append(b"k", b"abc"), b"append k 123456 0 3\r\n"),
            (StorageCommand::prepend(b"k", b"abc"), b"prepend k 123456 0 3\r\n"),
        ];
        for (cmd, expected) in cases {
            let (command, payload) = cmd.encode().unwrap();
            assert_eq!(command, *expected);
            assert_eq!(payload, b"abc\r\n");
        }
    }

    #[test]
    fn test_encode_cas() {
        let (command, payload) = StorageCommand::cas(b"mykey", b"myvalue", 12345)
            .flags(0)
            .encode()
            .unwrap();
        assert_eq!(command, b"cas mykey 0 0 7 12345\r\n");
        assert_eq!(payload, b"myvalue\r\n");
    }

    #[test]
    fn test_encode_cas_without_token() {
        let err = StorageCommand::new(StorageVerb::Cas, b"k", b"v")
            .encode()
            .unwrap_err();
        assert_eq!(err, Error::MissingArgument("cas_unique"));
    }

    #[test]
    fn test_length_field_counts_value_bytes_exactly() {
        // embedded CRLF and NUL must not affect the declared length
        let value = b"a\r\nb\0c";
        let (command, payload) = StorageCommand::set(b"k", value).encode().unwrap();
        assert_eq!(command, b"set k 123456 0 6\r\n");
        assert_eq!(payload, b"a\r\nb\0c\r\n");
    }

    #[test]
    fn test_encode_empty_value() {
        let (command, payload) = StorageCommand::set(b"k", b"").encode().unwrap();
        assert_eq!(command, b"set k 123456 0 0\r\n");
        assert_eq!(payload, b"\r\n");
    }

    #[test]
    fn test_encode_negative_exptime() {
        let (command, _) = StorageCommand::set(b"k", b"v").exptime(-1).encode().unwrap();
        assert_eq!(command, b"set k 123456 -1 1\r\n");
    }

    #[test]
    fn test_empty_key_rejected() {
        let err = StorageCommand::set(b"", b"v").encode().unwrap_err();
        assert_eq!(err, Error::MissingArgument("key"));
        assert_eq!(get_command(b"").unwrap_err(), Error::MissingArgument("key"));
    }

    #[test]
    fn test_invalid_key_rejected() {
        assert_eq!(
            StorageCommand::set(b"has space", b"v").encode().unwrap_err(),
            Error::InvalidKey
        );
        assert_eq!(
            StorageCommand::set(b"has\r\ncrlf", b"v").encode().unwrap_err(),
            Error::InvalidKey
        );
        let long = vec![b'x'; MAX_KEY_LEN + 1];
        assert_eq!(StorageCommand::set(&long, b"v").encode().unwrap_err(), Error::InvalidKey);
    }

    #[test]
    fn test_max_len_key_accepted() {
        let key = vec![b'x'; MAX_KEY_LEN];
        assert!(StorageCommand::set(&key, b"v").encode().is_ok());
    }

    #[test]
    fn test_get_command() {
        assert_eq!(get_command(b"mykey").unwrap(), b"get mykey\r\n");
    }

    #[test]
    fn test_gets_command() {
        let keys: &[&[u8]] = &[b"key1", b"key2", b"key3"];
        assert_eq!(gets_command(keys).unwrap(), b"gets key1 key2 key3\r\n");
    }

    #[test]
    fn test_gets_command_single() {
        let keys: &[&[u8]] = &[b"single"];
        assert_eq!(gets_command(keys).unwrap(), b"gets single\r\n");
    }

    #[test]
    fn test_gets_command_empty() {
        let keys: &[&[u8]] = &[];
        assert_eq!(gets_command(keys).unwrap_err(), Error::MissingArgument("keys"));
    }

    #[test]
    fn test_gets_command_validates_every_key() {
        let keys: &[&[u8]] = &[b"ok", b"not ok"];
        assert_eq!(gets_command(keys).unwrap_err(), Error::InvalidKey);
    }

    #[test]
    fn test_delete_command() {
        assert_eq!(delete_command(b"mykey").unwrap(), b"delete mykey\r\n");
    }

    #[test]
    fn test_counter_commands() {
        assert_eq!(incr_command(b"counter", 1).unwrap(), b"incr counter 1\r\n");
        assert_eq!(decr_command(b"counter", 99999).unwrap(), b"decr counter 99999\r\n");
    }

    #[test]
    fn test_touch_command() {
        assert_eq!(touch_command(b"mykey", 300).unwrap(), b"touch mykey 300\r\n");
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(flush_all_command(), b"flush_all\r\n");
        assert_eq!(version_command(), b"version\r\n");
    }
}
