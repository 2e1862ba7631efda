use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::commands::{CommandError, CommandOutcome};
use crate::resp::RespValue;
use crate::server::Server;
use crate::state::State;

pub struct ReplconfArguments {
    subcommand: String,
}

impl ReplconfArguments {
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        let Some(subcommand) = arguments.first() else {
            return Err(CommandError::WrongNumberOfArguments("replconf".to_string()));
        };

        Ok(Self {
            subcommand: subcommand.to_lowercase(),
        })
    }
}

/// `REPLCONF` plays three roles: a replica answers `GETACK` with its
/// current offset, a master consumes `ACK`s into the pending `WAIT`, and
/// every other form is a handshake no-op acknowledged with `+OK`.
pub async fn replconf(
    server: Arc<RwLock<Server>>,
    state: Arc<Mutex<State>>,
    arguments: &[String],
) -> Result<CommandOutcome, CommandError> {
    let replconf_arguments = ReplconfArguments::parse(arguments)?;

    match replconf_arguments.subcommand.as_str() {
        "getack" => {
            let offset = {
                let server_guard = server.read().await;
                server_guard.repl_offset
            };

            Ok(CommandOutcome::Reply(
                RespValue::Array(vec![
                    RespValue::BulkString("REPLCONF".to_string()),
                    RespValue::BulkString("ACK".to_string()),
                    RespValue::BulkString(offset.to_string()),
                ])
                .encode(),
            ))
        }
        "ack" => {
            let mut state_guard = state.lock().await;

            // While a WAIT is pending the ACK is consumed internally and no
            // frame goes back to the replica.
            if state_guard.record_ack() {
                Ok(CommandOutcome::NoReply)
            } else {
                Ok(CommandOutcome::Reply(
                    RespValue::SimpleString("OK".to_string()).encode(),
                ))
            }
        }
        _ => Ok(CommandOutcome::Reply(
            RespValue::SimpleString("OK".to_string()).encode(),
        )),
    }
}
