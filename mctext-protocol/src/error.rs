//! Error types for the protocol layer.

/// How much of an offending response a [`Error::Malformed`] carries.
const MALFORMED_DETAIL_MAX: usize = 128;

/// Errors produced while encoding commands or interpreting responses.
///
/// The storage outcomes (`NotStored`, `Exists`, `NotFound`) are failures of
/// the operation, not of the protocol itself; they are still surfaced as
/// errors so a caller can match on them exhaustively.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The server answered `ERROR\r\n`.
    #[error("server returned ERROR")]
    Generic,

    /// The server answered `CLIENT_ERROR <msg>\r\n`.
    #[error("client error: {0}")]
    Client(String),

    /// The server answered `SERVER_ERROR <msg>\r\n`.
    #[error("server error: {0}")]
    Server(String),

    /// Storage outcome: the data was not stored (`add` on an existing key,
    /// `replace`/`append`/`prepend` on a missing one).
    #[error("not stored")]
    NotStored,

    /// Storage outcome: the item was modified since the CAS token was
    /// fetched.
    #[error("exists")]
    Exists,

    /// Storage outcome: no item with this key.
    #[error("not found")]
    NotFound,

    /// The response matched no shape the protocol allows. Carries a
    /// truncated copy of the offending bytes for diagnosis.
    #[error("malformed response: {0:?}")]
    Malformed(String),

    /// A required command field was absent or empty.
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),

    /// The key is longer than [`MAX_KEY_LEN`](crate::MAX_KEY_LEN) or
    /// contains whitespace or control bytes.
    #[error("invalid key")]
    InvalidKey,
}

impl Error {
    /// Build a `Malformed` error from the offending raw bytes.
    pub(crate) fn malformed(raw: &[u8]) -> Self {
        let mut detail = String::from_utf8_lossy(raw).into_owned();
        if detail.len() > MALFORMED_DETAIL_MAX {
            detail.truncate(MALFORMED_DETAIL_MAX);
            detail.push_str("...");
        }
        Error::Malformed(detail)
    }

    /// Returns true if this is a storage outcome rather than a protocol
    /// failure.
    #[inline]
    pub fn is_storage_outcome(&self) -> bool {
        matches!(self, Error::NotStored | Error::Exists | Error::NotFound)
    }
}
