//! RESP wire codec and the byte-accurate command frame parser.
//!
//! Encoding covers every reply shape the server produces. Parsing consumes a
//! raw inbound buffer and yields complete command frames together with the
//! number of bytes they occupied on the wire, leaving any trailing partial
//! frame in place for the next read.

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum RespError {
    #[error("invalid UTF-8 sequence")]
    InvalidUtf8,
    #[error("invalid length prefix '{0}'")]
    InvalidLengthPrefix(String),
    #[error("unexpected element type '{0}'")]
    UnexpectedElementType(char),
    #[error("bulk string payload not terminated by CRLF")]
    UnterminatedBulkString,
    #[error("empty command array")]
    EmptyCommand,
}

impl RespError {
    pub fn as_string(&self) -> String {
        RespValue::Error(format!("ERR {}", self)).encode()
    }
}

/// A single RESP value, encodable to its wire representation.
#[derive(Debug, PartialEq, Clone)]
pub enum RespValue {
    SimpleString(String),
    Error(String),
    Integer(i64),
    BulkString(String),
    Null,
    Array(Vec<RespValue>),
    NullArray,
}

impl RespValue {
    /// Encodes the value as a RESP frame.
    ///
    /// The empty bulk string deliberately collapses into the null bulk
    /// `$-1\r\n`, preserving the wire behavior clients of this server
    /// already rely on.
    pub fn encode(&self) -> String {
        match self {
            RespValue::SimpleString(s) => format!("+{}\r\n", s),
            RespValue::Error(message) => format!("-{}\r\n", message),
            RespValue::Integer(value) => format!(":{}\r\n", value),
            RespValue::BulkString(s) if s.is_empty() => "$-1\r\n".to_string(),
            RespValue::BulkString(s) => format!("${}\r\n{}\r\n", s.len(), s),
            RespValue::Null => "$-1\r\n".to_string(),
            RespValue::Array(elements) => {
                let mut encoded = format!("*{}\r\n", elements.len());
                for element in elements {
                    encoded.push_str(&element.encode());
                }
                encoded
            }
            RespValue::NullArray => "*-1\r\n".to_string(),
        }
    }
}

/// Encodes a command as an array of bulk strings, the shape clients and the
/// replication link send commands in.
pub fn encode_command(parts: &[&str]) -> String {
    RespValue::Array(
        parts
            .iter()
            .map(|part| RespValue::BulkString(part.to_string()))
            .collect(),
    )
    .encode()
}

/// One complete command as received on the wire.
///
/// `raw` holds the exact inbound bytes of the frame so a master can forward
/// write commands to its replicas verbatim; its length is what replication
/// offset accounting advances by.
#[derive(Debug, PartialEq, Clone)]
pub struct CommandFrame {
    /// Upper-cased command name.
    pub name: String,
    /// Command arguments in wire order.
    pub args: Vec<String>,
    /// The exact bytes this frame occupied on the wire.
    pub raw: Vec<u8>,
}

impl CommandFrame {
    /// Number of bytes the frame occupied on the wire.
    pub fn wire_len(&self) -> usize {
        self.raw.len()
    }
}

enum Progress<T> {
    Complete(T, usize),
    Incomplete,
}

/// Drains `buffer` into zero or more complete command frames.
///
/// Returns the frames in wire order and the number of bytes consumed; a
/// trailing partial frame is not consumed. Accepted top-level shape is an
/// array of bulk strings or simple strings. Any other element sigil is a
/// parse error.
pub fn parse_frames(buffer: &[u8]) -> Result<(Vec<CommandFrame>, usize), RespError> {
    let mut frames = Vec::new();
    let mut cursor = 0;

    while cursor < buffer.len() {
        match read_frame(buffer, cursor)? {
            Progress::Complete(frame, next) => {
                frames.push(frame);
                cursor = next;
            }
            Progress::Incomplete => break,
        }
    }

    Ok((frames, cursor))
}

fn read_frame(buffer: &[u8], start: usize) -> Result<Progress<CommandFrame>, RespError> {
    if buffer[start] != b'*' {
        return Err(RespError::UnexpectedElementType(buffer[start] as char));
    }

    let (count_line, mut cursor) = match read_line(buffer, start + 1)? {
        Progress::Complete(line, next) => (line, next),
        Progress::Incomplete => return Ok(Progress::Incomplete),
    };

    let count = count_line
        .parse::<usize>()
        .map_err(|_| RespError::InvalidLengthPrefix(count_line.to_string()))?;

    if count == 0 {
        return Err(RespError::EmptyCommand);
    }

    let mut elements = Vec::with_capacity(count);

    while elements.len() < count {
        match read_element(buffer, cursor)? {
            Progress::Complete(element, next) => {
                elements.push(element);
                cursor = next;
            }
            Progress::Incomplete => return Ok(Progress::Incomplete),
        }
    }

    let name = elements[0].to_uppercase();
    let args = elements.split_off(1);

    Ok(Progress::Complete(
        CommandFrame {
            name,
            args,
            raw: buffer[start..cursor].to_vec(),
        },
        cursor,
    ))
}

fn read_element(buffer: &[u8], start: usize) -> Result<Progress<String>, RespError> {
    if start >= buffer.len() {
        return Ok(Progress::Incomplete);
    }

    match buffer[start] {
        b'$' => {
            let (length_line, payload_start) = match read_line(buffer, start + 1)? {
                Progress::Complete(line, next) => (line, next),
                Progress::Incomplete => return Ok(Progress::Incomplete),
            };

            let length = length_line
                .parse::<usize>()
                .map_err(|_| RespError::InvalidLengthPrefix(length_line.to_string()))?;

            // The payload is exactly `length` bytes and may itself contain
            // CRLF, so it cannot be line-scanned.
            let payload_end = payload_start + length;
            if buffer.len() < payload_end + 2 {
                return Ok(Progress::Incomplete);
            }

            if &buffer[payload_end..payload_end + 2] != b"\r\n" {
                return Err(RespError::UnterminatedBulkString);
            }

            let payload = str::from_utf8(&buffer[payload_start..payload_end])
                .map_err(|_| RespError::InvalidUtf8)?;

            Ok(Progress::Complete(payload.to_string(), payload_end + 2))
        }
        b'+' => match read_line(buffer, start + 1)? {
            Progress::Complete(line, next) => Ok(Progress::Complete(line.to_string(), next)),
            Progress::Incomplete => Ok(Progress::Incomplete),
        },
        other => Err(RespError::UnexpectedElementType(other as char)),
    }
}

fn read_line<'a>(buffer: &'a [u8], start: usize) -> Result<Progress<&'a str>, RespError> {
    let Some(terminator) = buffer[start..]
        .windows(2)
        .position(|window| window == b"\r\n")
        .map(|offset| start + offset)
    else {
        return Ok(Progress::Incomplete);
    };

    let line = str::from_utf8(&buffer[start..terminator]).map_err(|_| RespError::InvalidUtf8)?;

    Ok(Progress::Complete(line, terminator + 2))
}

#[cfg(test)]
mod tests {
    use super::{CommandFrame, RespError, RespValue, encode_command, parse_frames};

    #[test]
    fn test_encode() {
        let test_cases = vec![
            (RespValue::SimpleString("OK".into()), "+OK\r\n"),
            (
                RespValue::Error("ERR syntax error".into()),
                "-ERR syntax error\r\n",
            ),
            (RespValue::Integer(42), ":42\r\n"),
            (RespValue::Integer(-3), ":-3\r\n"),
            (RespValue::BulkString("mango".into()), "$5\r\nmango\r\n"),
            (RespValue::BulkString("".into()), "$-1\r\n"),
            (RespValue::Null, "$-1\r\n"),
            (RespValue::NullArray, "*-1\r\n"),
            (RespValue::Array(vec![]), "*0\r\n"),
            (
                RespValue::Array(vec![
                    RespValue::BulkString("GET".into()),
                    RespValue::BulkString("grape".into()),
                ]),
                "*2\r\n$3\r\nGET\r\n$5\r\ngrape\r\n",
            ),
        ];

        for (value, expected) in test_cases {
            assert_eq!(value.encode(), expected, "encoding {:?}", value);
        }
    }

    #[test]
    fn test_encode_command() {
        assert_eq!(encode_command(&["PING"]), "*1\r\n$4\r\nPING\r\n");
        assert_eq!(
            encode_command(&["REPLCONF", "GETACK", "*"]),
            "*3\r\n$8\r\nREPLCONF\r\n$6\r\nGETACK\r\n$1\r\n*\r\n"
        );
    }

    #[test]
    fn test_parse_single_frame() {
        let input = b"*3\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n";
        let (frames, consumed) = parse_frames(input).unwrap();

        assert_eq!(
            frames,
            vec![CommandFrame {
                name: "SET".into(),
                args: vec!["foo".into(), "bar".into()],
                raw: input.to_vec(),
            }]
        );
        assert_eq!(consumed, input.len());
    }

    #[test]
    fn test_parse_upper_cases_the_name_only() {
        let input = b"*2\r\n$4\r\necho\r\n$5\r\nHeLLo\r\n";
        let (frames, _) = parse_frames(input).unwrap();

        assert_eq!(frames[0].name, "ECHO");
        assert_eq!(frames[0].args, vec!["HeLLo".to_string()]);
    }

    #[test]
    fn test_parse_partial_frame_is_left_unconsumed() {
        let input = b"*1\r\n$4\r\nPING\r\n*2\r\n$3\r\nGET\r\n$3\r\nf";
        let (frames, consumed) = parse_frames(input).unwrap();

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].name, "PING");
        assert_eq!(consumed, 14);
    }

    #[test]
    fn test_parse_accepts_simple_string_elements() {
        let input = b"*2\r\n+REPLCONF\r\n+ACK\r\n";
        let (frames, consumed) = parse_frames(input).unwrap();

        assert_eq!(frames[0].name, "REPLCONF");
        assert_eq!(frames[0].args, vec!["ACK".to_string()]);
        assert_eq!(consumed, input.len());
    }

    #[test]
    fn test_parse_errors() {
        let test_cases: Vec<(&[u8], RespError)> = vec![
            (b":5\r\n", RespError::UnexpectedElementType(':')),
            (b"*1\r\n:5\r\n", RespError::UnexpectedElementType(':')),
            (b"*x\r\n", RespError::InvalidLengthPrefix("x".into())),
            (b"*1\r\n$abc\r\nhi\r\n", RespError::InvalidLengthPrefix("abc".into())),
            (b"*0\r\n", RespError::EmptyCommand),
            (b"*1\r\n$2\r\nhiXX", RespError::UnterminatedBulkString),
        ];

        for (input, expected) in test_cases {
            assert_eq!(
                parse_frames(input),
                Err(expected),
                "parsing {}",
                String::from_utf8_lossy(input)
            );
        }
    }
}
