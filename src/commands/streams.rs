//! Entry-id grammar shared by the stream commands.
//!
//! `XADD` accepts `*`, `<ms>-*` and explicit `<ms>-<seq>` forms, validated
//! against the stream's `last_id` so accepted ids are strictly increasing.
//! `XRANGE`/`XREAD` bounds accept a bare `<ms>` (with a command-dependent
//! default sequence) or `<ms>-<seq>`.

use crate::resp::RespValue;
use crate::store::{StreamEntry, StreamId};

pub const ID_TOO_SMALL: &str =
    "The ID specified in XADD is equal or smaller than the target stream top item";
pub const ID_MUST_EXCEED_ZERO: &str = "The ID specified in XADD must be greater than 0-0";
pub const ID_INVALID: &str = "Invalid stream ID specified as stream command argument";

/// Resolves an `XADD` id argument against the stream's current `last_id`.
pub fn resolve_entry_id(
    requested: &str,
    last_id: StreamId,
    now_ms: u64,
) -> Result<StreamId, String> {
    if requested == "*" {
        let seq = if last_id.ms == now_ms {
            last_id.seq + 1
        } else {
            0
        };

        return validate_against_last(StreamId::new(now_ms, seq), last_id);
    }

    let Some((ms_part, seq_part)) = requested.split_once('-') else {
        return Err(ID_INVALID.to_string());
    };

    let ms = ms_part.parse::<u64>().map_err(|_| ID_INVALID.to_string())?;

    if seq_part == "*" {
        let seq = if ms == last_id.ms {
            last_id.seq + 1
        } else if ms == 0 {
            1
        } else {
            0
        };

        return validate_against_last(StreamId::new(ms, seq), last_id);
    }

    let seq = seq_part.parse::<u64>().map_err(|_| ID_INVALID.to_string())?;
    let id = StreamId::new(ms, seq);

    if id == StreamId::ZERO {
        return Err(ID_MUST_EXCEED_ZERO.to_string());
    }

    validate_against_last(id, last_id)
}

fn validate_against_last(id: StreamId, last_id: StreamId) -> Result<StreamId, String> {
    if id <= last_id {
        return Err(ID_TOO_SMALL.to_string());
    }

    Ok(id)
}

/// Parses an `XRANGE` start bound; `-` is the open start and a bare
/// timestamp defaults its sequence to 0.
pub fn parse_range_start(raw: &str) -> Result<StreamId, String> {
    if raw == "-" {
        return Ok(StreamId::ZERO);
    }

    parse_bound(raw, 0)
}

/// Parses an `XRANGE` end bound; `+` is the open end and a bare timestamp
/// defaults its sequence to the maximum.
pub fn parse_range_end(raw: &str) -> Result<StreamId, String> {
    if raw == "+" {
        return Ok(StreamId::MAX);
    }

    parse_bound(raw, u64::MAX)
}

/// Parses an `XREAD` exclusive lower bound (`$` is resolved by the caller).
pub fn parse_read_id(raw: &str) -> Result<StreamId, String> {
    parse_bound(raw, 0)
}

fn parse_bound(raw: &str, default_seq: u64) -> Result<StreamId, String> {
    match raw.split_once('-') {
        None => {
            let ms = raw.parse::<u64>().map_err(|_| ID_INVALID.to_string())?;
            Ok(StreamId::new(ms, default_seq))
        }
        Some((ms_part, seq_part)) => {
            let ms = ms_part.parse::<u64>().map_err(|_| ID_INVALID.to_string())?;
            let seq = seq_part.parse::<u64>().map_err(|_| ID_INVALID.to_string())?;
            Ok(StreamId::new(ms, seq))
        }
    }
}

/// Renders entries as the `[id, [field, value, ...]]` array shape shared by
/// `XRANGE` and `XREAD`.
pub fn entries_to_resp(entries: &[&StreamEntry]) -> RespValue {
    RespValue::Array(
        entries
            .iter()
            .map(|entry| {
                let mut flattened = Vec::with_capacity(entry.fields.len() * 2);
                for (field, value) in &entry.fields {
                    flattened.push(RespValue::BulkString(field.clone()));
                    flattened.push(RespValue::BulkString(value.clone()));
                }

                RespValue::Array(vec![
                    RespValue::BulkString(entry.id.to_string()),
                    RespValue::Array(flattened),
                ])
            })
            .collect(),
    )
}
