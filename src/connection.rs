//! Per-connection dispatch.
//!
//! Each accepted socket gets its own task and inbound buffer. Bytes are
//! drained through the frame parser and the resulting commands run in
//! arrival order; replies are written in that same order, so a suspended
//! command (WAIT, blocking XREAD) holds everything queued behind it.

use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{Mutex, RwLock};

use crate::commands::{self, CommandError, CommandOutcome};
use crate::replication;
use crate::resp::parse_frames;
use crate::server::Server;
use crate::state::State;
use crate::store::Store;

pub async fn handle_client_connection(
    stream: TcpStream,
    peer_addr: String,
    server: Arc<RwLock<Server>>,
    store: Arc<Mutex<Store>>,
    state: Arc<Mutex<State>>,
) {
    let (mut reader, writer) = stream.into_split();
    let writer = Arc::new(RwLock::new(writer));
    let mut buffer = BytesMut::with_capacity(4096);
    let mut chunk = [0u8; 4096];

    'connection: loop {
        let read = match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(read) => read,
            Err(error) => {
                tracing::debug!(peer = %peer_addr, %error, "connection read failed");
                break;
            }
        };

        buffer.extend_from_slice(&chunk[..read]);

        let (frames, consumed) = match parse_frames(&buffer) {
            Ok(parsed) => parsed,
            Err(error) => {
                // A protocol error poisons everything behind it in the
                // buffer; answer once and drop the connection.
                let _ = write_to_stream(&writer, error.as_string().as_bytes()).await;
                break;
            }
        };
        let _ = buffer.split_to(consumed);

        for frame in frames {
            if rejects_replica_write(&server, &frame.name).await {
                let error = CommandError::ReplicaReadOnly;
                if let Err(error) = write_to_stream(&writer, error.as_string().as_bytes()).await {
                    tracing::debug!(peer = %peer_addr, %error, "response write failed");
                    break 'connection;
                }
                continue;
            }

            let outcome = commands::execute_client_command(
                frame,
                &peer_addr,
                Arc::clone(&server),
                Arc::clone(&store),
                Arc::clone(&state),
            )
            .await;

            let written = match outcome {
                Ok(CommandOutcome::Reply(reply)) => {
                    write_to_stream(&writer, reply.as_bytes()).await
                }
                Ok(CommandOutcome::NoReply) => Ok(()),
                Ok(CommandOutcome::FullResync { header }) => {
                    let transfer = write_to_stream(&writer, header.as_bytes()).await;
                    let transfer = match transfer {
                        Ok(()) => {
                            write_to_stream(&writer, &replication::full_resync_payload()).await
                        }
                        Err(error) => Err(error),
                    };

                    if transfer.is_ok() {
                        replication::register_replica(&server, &peer_addr, Arc::clone(&writer))
                            .await;
                    }

                    transfer
                }
                Err(error) => write_to_stream(&writer, error.as_string().as_bytes()).await,
            };

            if let Err(error) = written {
                tracing::debug!(peer = %peer_addr, %error, "response write failed");
                break 'connection;
            }
        }
    }

    replication::remove_replica(&server, &peer_addr).await;

    let mut state_guard = state.lock().await;
    state_guard.drop_transaction(&peer_addr);
}

/// The replica side of the replication stream: applies every frame the
/// master sends, advancing the offset once per applied frame.
///
/// `leftover` carries bytes the master coalesced with the snapshot
/// transfer. Responses are suppressed for everything except `REPLCONF`,
/// whose ACK answers ride this same connection back to the master.
pub async fn handle_master_link(
    stream: TcpStream,
    leftover: BytesMut,
    server: Arc<RwLock<Server>>,
    store: Arc<Mutex<Store>>,
    state: Arc<Mutex<State>>,
) {
    let (mut reader, mut writer) = stream.into_split();
    let mut buffer = leftover;
    let mut chunk = [0u8; 4096];

    loop {
        let (frames, consumed) = match parse_frames(&buffer) {
            Ok(parsed) => parsed,
            Err(error) => {
                tracing::error!(%error, "replication stream desynchronized");
                return;
            }
        };
        let _ = buffer.split_to(consumed);

        for frame in frames {
            let reply =
                commands::execute_replicated_command(&frame, &server, &store, &state).await;

            if let Some(reply) = reply {
                let written = async {
                    writer.write_all(reply.as_bytes()).await?;
                    writer.flush().await
                }
                .await;

                if let Err(error) = written {
                    tracing::warn!(%error, "lost connection to master");
                    return;
                }
            }

            // The GETACK answer above reports the offset up to the
            // previous frame; this frame is counted after it is applied.
            let mut server_guard = server.write().await;
            server_guard.repl_offset += frame.wire_len() as u64;
        }

        match reader.read(&mut chunk).await {
            Ok(0) => {
                tracing::warn!("master closed the replication stream");
                return;
            }
            Ok(read) => buffer.extend_from_slice(&chunk[..read]),
            Err(error) => {
                tracing::warn!(%error, "replication stream read failed");
                return;
            }
        }
    }
}

pub async fn write_to_stream(
    writer: &Arc<RwLock<OwnedWriteHalf>>,
    response: &[u8],
) -> tokio::io::Result<()> {
    let mut writer_guard = writer.write().await;
    writer_guard.write_all(response).await?;
    writer_guard.flush().await?;

    Ok(())
}

/// Replicas accept reads from direct clients but never writes; those only
/// arrive through the replication link.
async fn rejects_replica_write(server: &Arc<RwLock<Server>>, command_name: &str) -> bool {
    if !commands::is_write_command(command_name) {
        return false;
    }

    let server_guard = server.read().await;
    server_guard.replicas.is_none()
}
