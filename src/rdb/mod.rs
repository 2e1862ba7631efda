//! Strict reader for the canonical binary snapshot format.
//!
//! Only the subset this server loads at startup is understood: the 9-byte
//! header, auxiliary metadata, a single SELECTDB section and string-typed
//! entries with optional expiries. Anything else is a hard parse failure
//! that aborts the startup load.

mod encoding;
mod reader;

pub use reader::{RdbDatabase, RdbEntry, RdbFile};

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum RdbError {
    #[error("snapshot truncated")]
    Truncated,
    #[error("invalid snapshot header")]
    InvalidHeader,
    #[error("invalid size encoding")]
    InvalidSizeEncoding,
    #[error("LZF-compressed strings are not supported")]
    LzfUnsupported,
    #[error("unsupported value type 0x{0:02x}")]
    UnsupportedValueType(u8),
    #[error("key/value entry before SELECTDB")]
    MissingSelectDb,
    #[error("missing end-of-file marker")]
    MissingEof,
    #[error("invalid UTF-8 in snapshot string")]
    InvalidUtf8,
}
