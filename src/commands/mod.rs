//! Command dispatch and per-command semantics.
//!
//! Each command lives in its own file with an `Arguments` parser and a
//! handler; this module owns the dispatch table, transaction queuing and
//! the write-propagation hook. The replica's master link shares the same
//! dispatch but suppresses every reply except `REPLCONF`.

mod config;
mod echo;
mod error;
mod get;
mod incr;
mod info;
mod keys;
mod ping;
mod psync;
mod replconf;
mod set;
mod streams;
mod type_command;
mod wait;
mod xadd;
mod xrange;
mod xread;

pub use error::CommandError;
pub use streams::{ID_INVALID, ID_MUST_EXCEED_ZERO, ID_TOO_SMALL};

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::replication;
use crate::resp::{CommandFrame, RespValue};
use crate::server::Server;
use crate::state::State;
use crate::store::Store;

/// Commands that mutate the store and are forwarded verbatim to replicas.
const WRITE_COMMANDS: [&str; 3] = ["SET", "INCR", "XADD"];

pub fn is_write_command(name: &str) -> bool {
    WRITE_COMMANDS.contains(&name)
}

/// What the engine hands back to the connection layer.
#[derive(Debug, PartialEq)]
pub enum CommandOutcome {
    /// A ready frame to write to the client.
    Reply(String),
    /// Nothing is written now; the frame that would have been produced is
    /// consumed internally (a replica ACK feeding a pending WAIT).
    NoReply,
    /// Write the header, transfer the snapshot payload and register the
    /// peer as a replica.
    FullResync { header: String },
}

/// Runs one client command, including transaction queuing.
///
/// While a connection has an open transaction every command except
/// `MULTI`/`EXEC`/`DISCARD` is argument-checked, queued and answered with
/// `+QUEUED`; `EXEC` replays the queue in order and answers with the array
/// of collected replies.
pub async fn execute_client_command(
    frame: CommandFrame,
    peer_addr: &str,
    server: Arc<RwLock<Server>>,
    store: Arc<Mutex<Store>>,
    state: Arc<Mutex<State>>,
) -> Result<CommandOutcome, CommandError> {
    match frame.name.as_str() {
        "MULTI" => {
            require_arity(&frame, 0, "multi")?;

            let mut state_guard = state.lock().await;
            state_guard.start_transaction(peer_addr.to_string())?;

            Ok(CommandOutcome::Reply(
                RespValue::SimpleString("OK".to_string()).encode(),
            ))
        }
        "EXEC" => {
            require_arity(&frame, 0, "exec")?;

            let queued = {
                let mut state_guard = state.lock().await;
                state_guard
                    .take_transaction(peer_addr)
                    .map_err(|_| CommandError::ExecWithoutMulti)?
            };

            let mut replies = Vec::with_capacity(queued.len());

            for queued_frame in queued {
                match run_command(queued_frame, &server, &store, &state).await {
                    Ok(CommandOutcome::Reply(reply)) => replies.push(reply),
                    Ok(_) => (),
                    Err(error) => replies.push(error.as_string()),
                }
            }

            let mut response = format!("*{}\r\n", replies.len());
            for reply in &replies {
                response.push_str(reply);
            }

            Ok(CommandOutcome::Reply(response))
        }
        "DISCARD" => {
            require_arity(&frame, 0, "discard")?;

            let mut state_guard = state.lock().await;
            state_guard
                .take_transaction(peer_addr)
                .map_err(|_| CommandError::DiscardWithoutMulti)?;

            Ok(CommandOutcome::Reply(
                RespValue::SimpleString("OK".to_string()).encode(),
            ))
        }
        _ => {
            {
                let mut state_guard = state.lock().await;

                if state_guard.in_transaction(peer_addr) {
                    if let Some(error) = validate_arguments(&frame) {
                        return Err(error);
                    }

                    state_guard.queue_command(peer_addr, frame)?;

                    return Ok(CommandOutcome::Reply(
                        RespValue::SimpleString("QUEUED".to_string()).encode(),
                    ));
                }
            }

            run_command(frame, &server, &store, &state).await
        }
    }
}

/// Runs one command applied from the replication link.
///
/// Replies are suppressed for everything except `REPLCONF`, which must
/// answer (the `GETACK`/`ACK` exchange rides the same connection).
pub async fn execute_replicated_command(
    frame: &CommandFrame,
    server: &Arc<RwLock<Server>>,
    store: &Arc<Mutex<Store>>,
    state: &Arc<Mutex<State>>,
) -> Option<String> {
    match dispatch(frame, server, store, state).await {
        Ok(CommandOutcome::Reply(reply)) if frame.name == "REPLCONF" => Some(reply),
        Ok(_) => None,
        Err(error) => {
            tracing::debug!(command = %frame.name, %error, "replicated command failed");
            None
        }
    }
}

async fn run_command(
    frame: CommandFrame,
    server: &Arc<RwLock<Server>>,
    store: &Arc<Mutex<Store>>,
    state: &Arc<Mutex<State>>,
) -> Result<CommandOutcome, CommandError> {
    let outcome = dispatch(&frame, server, store, state).await?;

    if is_write_command(&frame.name) {
        replication::propagate_write(server, &frame).await;
    }

    Ok(outcome)
}

async fn dispatch(
    frame: &CommandFrame,
    server: &Arc<RwLock<Server>>,
    store: &Arc<Mutex<Store>>,
    state: &Arc<Mutex<State>>,
) -> Result<CommandOutcome, CommandError> {
    match frame.name.as_str() {
        "PING" => ping::ping(&frame.args),
        "ECHO" => echo::echo(&frame.args),
        "SET" => set::set(Arc::clone(store), &frame.args).await,
        "GET" => get::get(Arc::clone(store), &frame.args).await,
        "INCR" => incr::incr(Arc::clone(store), &frame.args).await,
        "KEYS" => keys::keys(Arc::clone(store), &frame.args).await,
        "TYPE" => type_command::type_command(Arc::clone(store), &frame.args).await,
        "CONFIG" => config::config(Arc::clone(server), &frame.args).await,
        "INFO" => info::info(Arc::clone(server), &frame.args).await,
        "XADD" => xadd::xadd(Arc::clone(store), Arc::clone(state), &frame.args).await,
        "XRANGE" => xrange::xrange(Arc::clone(store), &frame.args).await,
        "XREAD" => xread::xread(Arc::clone(store), Arc::clone(state), &frame.args).await,
        "REPLCONF" => replconf::replconf(Arc::clone(server), Arc::clone(state), &frame.args).await,
        "PSYNC" => psync::psync(Arc::clone(server), &frame.args).await,
        "WAIT" => wait::wait(Arc::clone(server), Arc::clone(state), &frame.args).await,
        _ => Err(CommandError::UnknownCommand(frame.name.clone())),
    }
}

/// Argument check used when queuing into a transaction, so malformed
/// commands are rejected at queue time instead of surfacing inside EXEC.
fn validate_arguments(frame: &CommandFrame) -> Option<CommandError> {
    match frame.name.as_str() {
        "PING" => ping::PingArguments::parse(&frame.args).err(),
        "ECHO" => echo::EchoArguments::parse(&frame.args).err(),
        "SET" => set::SetArguments::parse(&frame.args).err(),
        "GET" => get::GetArguments::parse(&frame.args).err(),
        "INCR" => incr::IncrArguments::parse(&frame.args).err(),
        "KEYS" => keys::KeysArguments::parse(&frame.args).err(),
        "TYPE" => type_command::TypeArguments::parse(&frame.args).err(),
        "CONFIG" => config::ConfigArguments::parse(&frame.args).err(),
        "INFO" => info::InfoArguments::parse(&frame.args).err(),
        "XADD" => xadd::XaddArguments::parse(&frame.args).err(),
        "XRANGE" => xrange::XrangeArguments::parse(&frame.args).err(),
        "XREAD" => xread::XreadArguments::parse(&frame.args).err(),
        "REPLCONF" => replconf::ReplconfArguments::parse(&frame.args).err(),
        "PSYNC" => psync::PsyncArguments::parse(&frame.args).err(),
        "WAIT" => wait::WaitArguments::parse(&frame.args).err(),
        _ => Some(CommandError::UnknownCommand(frame.name.clone())),
    }
}

fn require_arity(
    frame: &CommandFrame,
    expected: usize,
    display_name: &str,
) -> Result<(), CommandError> {
    if frame.args.len() != expected {
        return Err(CommandError::WrongNumberOfArguments(
            display_name.to_string(),
        ));
    }

    Ok(())
}
