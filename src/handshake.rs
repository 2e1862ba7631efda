//! Replica-side replication handshake.
//!
//! A replica walks the master through PING, its listening port, its
//! capabilities and finally `PSYNC ? -1`, then consumes the `+FULLRESYNC`
//! header and the length-prefixed snapshot transfer. Whatever the master
//! coalesced after the snapshot is handed back with the stream so the
//! streaming loop starts with an accurate byte count.

use bytes::BytesMut;
use regex::Regex;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::resp::encode_command;

#[derive(Error, Debug)]
pub enum HandshakeError {
    #[error("I/O error during handshake: {0}")]
    Io(#[from] std::io::Error),
    #[error("master closed the connection mid-handshake")]
    ConnectionClosed,
    #[error("unexpected reply from master: {0}")]
    UnexpectedReply(String),
    #[error("malformed FULLRESYNC reply: {0}")]
    MalformedFullResync(String),
    #[error("invalid snapshot transfer header: {0}")]
    InvalidTransferHeader(String),
}

/// A buffered connection to the master, alive for the handshake only.
pub struct MasterLink {
    stream: TcpStream,
    buffer: BytesMut,
}

impl MasterLink {
    pub async fn connect(master_addr: &str) -> Result<Self, HandshakeError> {
        let stream = TcpStream::connect(master_addr).await?;

        Ok(Self {
            stream,
            buffer: BytesMut::with_capacity(4096),
        })
    }

    /// Drives the handshake to completion.
    ///
    /// On success returns the stream together with any bytes that arrived
    /// coalesced after the snapshot transfer; those already belong to the
    /// replication stream and count toward the offset.
    pub async fn perform(
        mut self,
        listening_port: u32,
    ) -> Result<(TcpStream, BytesMut), HandshakeError> {
        self.send(&["PING"]).await?;
        self.expect_simple("PONG").await?;

        self.send(&["REPLCONF", "listening-port", &listening_port.to_string()])
            .await?;
        self.expect_simple("OK").await?;

        self.send(&["REPLCONF", "capa", "psync2"]).await?;
        self.expect_simple("OK").await?;

        self.send(&["PSYNC", "?", "-1"]).await?;
        let full_resync = self.read_simple_line().await?;
        validate_full_resync(&full_resync)?;

        self.consume_snapshot().await?;

        Ok((self.stream, self.buffer))
    }

    async fn send(&mut self, parts: &[&str]) -> Result<(), HandshakeError> {
        self.stream
            .write_all(encode_command(parts).as_bytes())
            .await?;
        self.stream.flush().await?;

        Ok(())
    }

    async fn expect_simple(&mut self, expected: &str) -> Result<(), HandshakeError> {
        let line = self.read_simple_line().await?;

        if line != expected {
            return Err(HandshakeError::UnexpectedReply(line));
        }

        Ok(())
    }

    /// Reads one `+<text>\r\n` reply, returning the text.
    async fn read_simple_line(&mut self) -> Result<String, HandshakeError> {
        let line = self.read_line().await?;

        line.strip_prefix('+')
            .map(|text| text.to_string())
            .ok_or(HandshakeError::UnexpectedReply(line))
    }

    async fn read_line(&mut self) -> Result<String, HandshakeError> {
        loop {
            if let Some(terminator) = self
                .buffer
                .windows(2)
                .position(|window| window == b"\r\n")
            {
                let line = self.buffer.split_to(terminator + 2);

                return str::from_utf8(&line[..terminator])
                    .map(|text| text.to_string())
                    .map_err(|_| {
                        HandshakeError::UnexpectedReply(
                            String::from_utf8_lossy(&line).to_string(),
                        )
                    });
            }

            self.fill().await?;
        }
    }

    /// Consumes the `$<len>\r\n<len bytes>` snapshot transfer. Unlike a
    /// bulk string there is no trailing CRLF after the payload.
    async fn consume_snapshot(&mut self) -> Result<(), HandshakeError> {
        let header = self.read_line().await?;

        let length = header
            .strip_prefix('$')
            .and_then(|digits| digits.parse::<usize>().ok())
            .ok_or_else(|| HandshakeError::InvalidTransferHeader(header.clone()))?;

        while self.buffer.len() < length {
            self.fill().await?;
        }

        let _ = self.buffer.split_to(length);
        Ok(())
    }

    async fn fill(&mut self) -> Result<(), HandshakeError> {
        let mut chunk = [0u8; 4096];
        let read = self.stream.read(&mut chunk).await?;

        if read == 0 {
            return Err(HandshakeError::ConnectionClosed);
        }

        self.buffer.extend_from_slice(&chunk[..read]);
        Ok(())
    }
}

fn validate_full_resync(line: &str) -> Result<(), HandshakeError> {
    let parts: Vec<&str> = line.split_whitespace().collect();

    let valid = parts.len() == 3
        && parts[0] == "FULLRESYNC"
        && is_valid_replication_id(parts[1])
        && parts[2].parse::<u64>().is_ok();

    if !valid {
        return Err(HandshakeError::MalformedFullResync(line.to_string()));
    }

    Ok(())
}

fn is_valid_replication_id(replication_id: &str) -> bool {
    let pattern = Regex::new(r"^[a-zA-Z0-9]{40}$").unwrap();
    pattern.is_match(replication_id)
}
