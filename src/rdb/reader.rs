use std::collections::HashMap;

use super::RdbError;
use super::encoding::{read_length, read_string, take};

const OPCODE_METADATA: u8 = 0xFA;
const OPCODE_SELECT_DB: u8 = 0xFE;
const OPCODE_EXPIRY_MILLISECONDS: u8 = 0xFC;
const OPCODE_EXPIRY_SECONDS: u8 = 0xFD;
const OPCODE_END_OF_FILE: u8 = 0xFF;
const TYPE_STRING: u8 = 0x00;

/// One key/value pair from the snapshot, with its expiry normalized to
/// absolute milliseconds.
#[derive(Debug, PartialEq, Clone)]
pub struct RdbEntry {
    pub key: String,
    pub value: String,
    pub expires_at_ms: Option<u64>,
}

/// The first database section of the snapshot.
#[derive(Debug, PartialEq, Clone)]
pub struct RdbDatabase {
    pub index: usize,
    pub size: usize,
    pub expiry_size: usize,
    pub entries: Vec<RdbEntry>,
}

/// A fully parsed snapshot.
#[derive(Debug, PartialEq, Clone)]
pub struct RdbFile {
    /// The first nine bytes, taken verbatim (e.g. `REDIS0011`).
    pub header: String,
    pub metadata: HashMap<String, String>,
    pub db: RdbDatabase,
}

impl RdbFile {
    /// Parses a complete snapshot from an owned byte buffer.
    ///
    /// The reader is strict: a missing SELECTDB section, a missing
    /// end-of-file marker, an LZF string or a non-string value type all
    /// fail the parse.
    pub fn parse(bytes: &[u8]) -> Result<RdbFile, RdbError> {
        let header_bytes = take(bytes, 0, 9).map_err(|_| RdbError::InvalidHeader)?;
        let header = str::from_utf8(header_bytes).map_err(|_| RdbError::InvalidHeader)?;

        if !header.starts_with("REDIS") {
            return Err(RdbError::InvalidHeader);
        }

        let mut cursor = 9;
        let mut metadata = HashMap::new();
        let mut db: Option<RdbDatabase> = None;
        let mut pending_expiry_ms: Option<u64> = None;
        let mut reached_eof = false;

        while cursor < bytes.len() {
            let opcode = take(bytes, cursor, 1)?[0];
            cursor += 1;

            match opcode {
                OPCODE_METADATA => {
                    let (name, consumed) = read_string(bytes, cursor)?;
                    cursor += consumed;
                    let (value, consumed) = read_string(bytes, cursor)?;
                    cursor += consumed;

                    metadata.insert(name, value);
                }
                OPCODE_SELECT_DB => {
                    let (index, consumed) = read_length(bytes, cursor)?;
                    cursor += consumed;

                    // The RESIZEDB marker byte is consumed without
                    // inspection; the two table sizes follow it.
                    take(bytes, cursor, 1)?;
                    cursor += 1;

                    let (size, consumed) = read_length(bytes, cursor)?;
                    cursor += consumed;
                    let (expiry_size, consumed) = read_length(bytes, cursor)?;
                    cursor += consumed;

                    db = Some(RdbDatabase {
                        index,
                        size,
                        expiry_size,
                        entries: Vec::new(),
                    });
                }
                OPCODE_EXPIRY_MILLISECONDS => {
                    let slice = take(bytes, cursor, 8)?;
                    cursor += 8;

                    let expiry =
                        u64::from_le_bytes(slice.try_into().map_err(|_| RdbError::Truncated)?);
                    pending_expiry_ms = Some(expiry);
                }
                OPCODE_EXPIRY_SECONDS => {
                    let slice = take(bytes, cursor, 4)?;
                    cursor += 4;

                    let seconds =
                        u32::from_le_bytes(slice.try_into().map_err(|_| RdbError::Truncated)?);
                    pending_expiry_ms = Some(seconds as u64 * 1000);
                }
                TYPE_STRING => {
                    let database = db.as_mut().ok_or(RdbError::MissingSelectDb)?;

                    let (key, consumed) = read_string(bytes, cursor)?;
                    cursor += consumed;
                    let (value, consumed) = read_string(bytes, cursor)?;
                    cursor += consumed;

                    database.entries.push(RdbEntry {
                        key,
                        value,
                        expires_at_ms: pending_expiry_ms.take(),
                    });
                }
                OPCODE_END_OF_FILE => {
                    // The trailing checksum bytes after the marker are not
                    // validated.
                    reached_eof = true;
                    break;
                }
                unsupported => return Err(RdbError::UnsupportedValueType(unsupported)),
            }
        }

        if !reached_eof {
            return Err(RdbError::MissingEof);
        }

        let db = db.ok_or(RdbError::MissingSelectDb)?;

        Ok(RdbFile {
            header: header.to_string(),
            metadata,
            db,
        })
    }
}
