//! Response classification and parsing for the memcached ASCII protocol.
//!
//! Response shapes handled here:
//! - `VALUE <key> <flags> <bytes>[ <cas>]\r\n<data>\r\n ... END\r\n` - fetch
//! - `STORED\r\n` / `NOT_STORED\r\n` / `EXISTS\r\n` / `NOT_FOUND\r\n` - storage
//! - `DELETED\r\n` / `TOUCHED\r\n` / `OK\r\n` / `VERSION <v>\r\n` / `<number>\r\n`
//! - `ERROR\r\n` / `CLIENT_ERROR <msg>\r\n` / `SERVER_ERROR <msg>\r\n`
//!
//! Fetch parsing never splits the buffer on `\r\n` generically: the data
//! length declared in each meta line is authoritative, and the data itself
//! may contain `\r\n`.

use crate::error::Error;

const SENTINEL: &[u8] = b"END\r\n";
const VALUE_PREFIX: &[u8] = b"VALUE ";

/// One entry from a fetch response, in server-returned order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Value {
    pub key: Vec<u8>,
    /// Flags stored with the item. Carried for forward compatibility; no
    /// current operation consumes them.
    pub flags: u32,
    /// Exactly the number of bytes the meta line declared.
    pub data: Vec<u8>,
    /// CAS token, present when the server appends the fifth meta field
    /// (responses to `gets`).
    pub cas: Option<u64>,
}

/// Classify protocol-level error lines.
///
/// Returns `None` when the response is not an error at this layer; the
/// command-specific classifier or parser runs next. Must be called before
/// any command-specific parsing, since error lines never match a
/// success-line shape.
pub fn classify_error(raw: &[u8]) -> Option<Error> {
    if raw == b"ERROR\r\n" {
        return Some(Error::Generic);
    }
    if let Some(msg) = prefixed_line(raw, b"CLIENT_ERROR ") {
        return Some(Error::Client(String::from_utf8_lossy(msg).into_owned()));
    }
    if let Some(msg) = prefixed_line(raw, b"SERVER_ERROR ") {
        return Some(Error::Server(String::from_utf8_lossy(msg).into_owned()));
    }
    None
}

/// Classify the response to a storage command.
///
/// Call only after [`classify_error`] returned `None`, so `CLIENT_ERROR`
/// and `SERVER_ERROR` lines are not reported as malformed.
pub fn storage_result(raw: &[u8]) -> Result<(), Error> {
    if raw == b"STORED\r\n" {
        Ok(())
    } else if raw == b"NOT_STORED\r\n" {
        Err(Error::NotStored)
    } else if raw == b"EXISTS\r\n" {
        Err(Error::Exists)
    } else if raw == b"NOT_FOUND\r\n" {
        Err(Error::NotFound)
    } else {
        Err(Error::malformed(raw))
    }
}

/// Parse a complete fetch response into its entries.
///
/// An empty entry list is a valid result: requested keys absent from the
/// store simply produce no entry. Entry order is whatever the server
/// chose, which for multi-key `gets` need not match request order.
pub fn parse_fetch(raw: &[u8]) -> Result<Vec<Value>, Error> {
    if !raw.ends_with(SENTINEL) {
        return Err(Error::malformed(raw));
    }
    let mut body = if raw.len() == SENTINEL.len() {
        &raw[..0]
    } else if raw.ends_with(b"\r\nEND\r\n") {
        &raw[..raw.len() - b"\r\nEND\r\n".len()]
    } else {
        return Err(Error::malformed(raw));
    };

    let mut values = Vec::new();
    while !body.is_empty() {
        if !body.starts_with(VALUE_PREFIX) {
            return Err(Error::malformed(body));
        }
        let line_end = find_crlf(body).ok_or_else(|| Error::malformed(body))?;
        let meta = &body[..line_end];

        // VALUE <key> <flags> <bytes>, plus the cas token for `gets`
        let fields: Vec<&[u8]> = meta.split(|&b| b == b' ').collect();
        let (key, flags, declared_len, cas) = match fields.as_slice() {
            [_, key, flags, len] => (key, flags, len, None),
            [_, key, flags, len, cas] => (key, flags, len, Some(cas)),
            _ => return Err(Error::malformed(meta)),
        };
        let flags = parse_u32(flags)?;
        let declared_len = parse_len(declared_len)?;
        let cas = match cas {
            Some(cas) => Some(parse_u64(cas)?),
            None => None,
        };

        // the value is located by byte offset alone, never by scanning
        // for a delimiter
        let data_start = line_end + 2;
        let data_end = data_start
            .checked_add(declared_len)
            .filter(|&end| end <= body.len())
            .ok_or_else(|| Error::malformed(meta))?;

        values.push(Value {
            key: key.to_vec(),
            flags,
            data: body[data_start..data_end].to_vec(),
            cas,
        });

        if data_end == body.len() {
            body = &body[body.len()..];
        } else {
            // two separator bytes before the next meta line, consumed
            // without inspection
            if body.len() < data_end + 2 {
                return Err(Error::malformed(&body[data_end..]));
            }
            body = &body[data_end + 2..];
        }
    }
    Ok(values)
}

/// Parse the response to `incr`/`decr`: the new counter value, or `None`
/// when the key does not exist.
pub fn parse_numeric(raw: &[u8]) -> Result<Option<u64>, Error> {
    if raw == b"NOT_FOUND\r\n" {
        return Ok(None);
    }
    let line = strip_crlf(raw).ok_or_else(|| Error::malformed(raw))?;
    if line.is_empty() || !line.iter().all(|b| b.is_ascii_digit()) {
        return Err(Error::malformed(raw));
    }
    parse_u64(line).map(Some)
}

/// Parse the response to `delete`: `true` if the key existed.
pub fn parse_delete(raw: &[u8]) -> Result<bool, Error> {
    if raw == b"DELETED\r\n" {
        Ok(true)
    } else if raw == b"NOT_FOUND\r\n" {
        Ok(false)
    } else {
        Err(Error::malformed(raw))
    }
}

/// Parse the response to `touch`: `true` if the key existed.
pub fn parse_touch(raw: &[u8]) -> Result<bool, Error> {
    if raw == b"TOUCHED\r\n" {
        Ok(true)
    } else if raw == b"NOT_FOUND\r\n" {
        Ok(false)
    } else {
        Err(Error::malformed(raw))
    }
}

/// Parse an `OK\r\n` response (`flush_all`).
pub fn parse_ok(raw: &[u8]) -> Result<(), Error> {
    if raw == b"OK\r\n" {
        Ok(())
    } else {
        Err(Error::malformed(raw))
    }
}

/// Parse a `VERSION <version>\r\n` response.
pub fn parse_version(raw: &[u8]) -> Result<String, Error> {
    match prefixed_line(raw, b"VERSION ") {
        Some(version) => Ok(String::from_utf8_lossy(version).into_owned()),
        None => Err(Error::malformed(raw)),
    }
}

/// Byte length of the first complete response in `buf`, or `None` if more
/// bytes are needed.
///
/// This is the framing hook for transports reading from a stream: it
/// honors the declared length of `VALUE` blocks, so a `\r\n` inside a
/// binary-safe value is never mistaken for a response terminator. On a
/// meta line that cannot be framed at all, the available bytes are
/// returned as-is and the parser reports the damage.
pub fn frame_len(buf: &[u8]) -> Option<usize> {
    let mut pos = 0;
    loop {
        let rest = &buf[pos..];
        let line_end = find_crlf(rest)?;
        let line = &rest[..line_end];
        if !line.starts_with(VALUE_PREFIX) {
            // any non-VALUE line terminates a response: a single-line
            // reply or the END sentinel of a fetch stream
            return Some(pos + line_end + 2);
        }
        let declared_len = line
            .split(|&b| b == b' ')
            .nth(3)
            .and_then(|len| std::str::from_utf8(len).ok())
            .and_then(|len| len.parse::<usize>().ok());
        let Some(declared_len) = declared_len else {
            return Some(buf.len());
        };
        let after_meta = pos + line_end + 2;
        let Some(after_data) = after_meta
            .checked_add(declared_len)
            .and_then(|end| end.checked_add(2))
        else {
            return Some(buf.len());
        };
        if buf.len() < after_data {
            return None;
        }
        pos = after_data;
    }
}

/// Find `\r\n` in data, returning the position of `\r`.
fn find_crlf(data: &[u8]) -> Option<usize> {
    memchr::memchr(b'\r', data).and_then(|pos| {
        if pos + 1 < data.len() && data[pos + 1] == b'\n' {
            Some(pos)
        } else {
            None
        }
    })
}

fn prefixed_line<'a>(raw: &'a [u8], prefix: &[u8]) -> Option<&'a [u8]> {
    if raw.len() >= prefix.len() + 2 && raw.starts_with(prefix) && raw.ends_with(b"\r\n") {
        Some(&raw[prefix.len()..raw.len() - 2])
    } else {
        None
    }
}

fn strip_crlf(raw: &[u8]) -> Option<&[u8]> {
    if raw.ends_with(b"\r\n") {
        Some(&raw[..raw.len() - 2])
    } else {
        None
    }
}

fn parse_u32(data: &[u8]) -> Result<u32, Error> {
    std::str::from_utf8(data)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::malformed(data))
}

fn parse_u64(data: &[u8]) -> Result<u64, Error> {
    std::str::from_utf8(data)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::malformed(data))
}

fn parse_len(data: &[u8]) -> Result<usize, Error> {
    std::str::from_utf8(data)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::malformed(data))
}
