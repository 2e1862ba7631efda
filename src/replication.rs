//! Master-side replication: the replica registry, verbatim write
//! propagation and the `GETACK` fan-out that backs `WAIT`.

use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::RwLock;

use crate::resp::{CommandFrame, encode_command};
use crate::server::Server;

/// The fixed empty snapshot transferred after `+FULLRESYNC`: a header,
/// auxiliary metadata and the end-of-file marker, no database section.
pub const EMPTY_RDB: [u8; 88] = [
    0x52, 0x45, 0x44, 0x49, 0x53, 0x30, 0x30, 0x31, 0x31, 0xfa, 0x09,
    0x72, 0x65, 0x64, 0x69, 0x73, 0x2d, 0x76, 0x65, 0x72, 0x05, 0x37,
    0x2e, 0x32, 0x2e, 0x30, 0xfa, 0x0a, 0x72, 0x65, 0x64, 0x69, 0x73,
    0x2d, 0x62, 0x69, 0x74, 0x73, 0xc0, 0x40, 0xfa, 0x05, 0x63, 0x74,
    0x69, 0x6d, 0x65, 0xc2, 0x6d, 0x08, 0xbc, 0x65, 0xfa, 0x08, 0x75,
    0x73, 0x65, 0x64, 0x2d, 0x6d, 0x65, 0x6d, 0xc2, 0xb0, 0xc4, 0x10,
    0x00, 0xfa, 0x08, 0x61, 0x6f, 0x66, 0x2d, 0x62, 0x61, 0x73, 0x65,
    0xc0, 0x00, 0xff, 0xf0, 0x6e, 0x3b, 0xfe, 0xc0, 0xff, 0x5a, 0xa2,
];

/// A registered replica connection: the shared writer half its frames are
/// forwarded through.
#[derive(Debug)]
pub struct Replica {
    pub writer: Arc<RwLock<OwnedWriteHalf>>,
}

/// The raw length-prefixed snapshot transfer written right after the
/// `+FULLRESYNC` header. Unlike a bulk string there is no trailing CRLF.
pub fn full_resync_payload() -> Vec<u8> {
    let mut payload = format!("${}\r\n", EMPTY_RDB.len()).into_bytes();
    payload.extend_from_slice(&EMPTY_RDB);
    payload
}

pub async fn register_replica(
    server: &Arc<RwLock<Server>>,
    peer_addr: &str,
    writer: Arc<RwLock<OwnedWriteHalf>>,
) {
    let mut server_guard = server.write().await;

    if let Some(replicas) = &mut server_guard.replicas {
        replicas.insert(peer_addr.to_string(), Replica { writer });
        tracing::info!(peer = peer_addr, fleet = replicas.len(), "replica attached");
    }
}

pub async fn remove_replica(server: &Arc<RwLock<Server>>, peer_addr: &str) {
    let mut server_guard = server.write().await;

    if let Some(replicas) = &mut server_guard.replicas {
        if replicas.remove(peer_addr).is_some() {
            tracing::info!(peer = peer_addr, fleet = replicas.len(), "replica detached");
        }
    }
}

/// Forwards the exact inbound bytes of a write command to every replica,
/// drops replicas whose connection failed, then advances the replication
/// offset by the frame's wire length.
pub async fn propagate_write(server: &Arc<RwLock<Server>>, frame: &CommandFrame) {
    let mut server_guard = server.write().await;

    let Some(replicas) = &mut server_guard.replicas else {
        return;
    };

    let dead = write_to_replicas(replicas, &frame.raw).await;
    for peer_addr in dead {
        replicas.remove(&peer_addr);
        tracing::warn!(peer = %peer_addr, "dropping unreachable replica");
    }

    server_guard.repl_offset += frame.wire_len() as u64;
}

/// Fans `REPLCONF GETACK *` out to every replica. The replies come back as
/// inbound `REPLCONF ACK` frames on each replica's connection and are
/// counted against the pending WAIT.
pub async fn broadcast_getack(server: &Arc<RwLock<Server>>) {
    let request = encode_command(&["REPLCONF", "GETACK", "*"]).into_bytes();

    let mut server_guard = server.write().await;

    let Some(replicas) = &mut server_guard.replicas else {
        return;
    };

    let dead = write_to_replicas(replicas, &request).await;
    for peer_addr in dead {
        replicas.remove(&peer_addr);
        tracing::warn!(peer = %peer_addr, "dropping unreachable replica");
    }
}

async fn write_to_replicas(
    replicas: &std::collections::HashMap<String, Replica>,
    bytes: &[u8],
) -> Vec<String> {
    let mut dead = Vec::new();

    for (peer_addr, replica) in replicas.iter() {
        let mut writer_guard = replica.writer.write().await;

        let written = async {
            writer_guard.write_all(bytes).await?;
            writer_guard.flush().await
        }
        .await;

        if written.is_err() {
            dead.push(peer_addr.clone());
        }
    }

    dead
}

#[cfg(test)]
mod tests {
    use super::{EMPTY_RDB, full_resync_payload};

    #[test]
    fn test_empty_snapshot_shape() {
        assert_eq!(EMPTY_RDB.len(), 88);
        assert_eq!(&EMPTY_RDB[0..9], b"REDIS0011");
        // End-of-file marker followed by the 8-byte checksum.
        assert_eq!(EMPTY_RDB[79], 0xFF);
    }

    #[test]
    fn test_full_resync_payload_has_no_trailing_crlf() {
        let payload = full_resync_payload();

        assert!(payload.starts_with(b"$88\r\n"));
        assert_eq!(payload.len(), 5 + 88);
        assert_ne!(&payload[payload.len() - 2..], b"\r\n");
    }
}
