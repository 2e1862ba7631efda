use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::time::timeout;

use crate::commands::{CommandError, CommandOutcome};
use crate::replication;
use crate::resp::RespValue;
use crate::server::Server;
use crate::state::State;

pub struct WaitArguments {
    replica_goal: i64,
    timeout_ms: u64,
}

impl WaitArguments {
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        if arguments.len() != 2 {
            return Err(CommandError::WrongNumberOfArguments("wait".to_string()));
        }

        let replica_goal = arguments[0]
            .parse::<i64>()
            .map_err(|_| CommandError::SyntaxError)?;
        let timeout_ms = arguments[1]
            .parse::<u64>()
            .map_err(|_| CommandError::SyntaxError)?;

        Ok(Self {
            replica_goal,
            timeout_ms,
        })
    }
}

/// Blocks until `replica_goal` replicas have acknowledged the propagated
/// stream or the timeout fires, answering with the ack count reached.
///
/// A goal of zero or less answers immediately, as does a master that has
/// not propagated any write yet (every attached replica is trivially in
/// sync).
pub async fn wait(
    server: Arc<RwLock<Server>>,
    state: Arc<Mutex<State>>,
    arguments: &[String],
) -> Result<CommandOutcome, CommandError> {
    let wait_arguments = WaitArguments::parse(arguments)?;

    if wait_arguments.replica_goal <= 0 {
        return Ok(CommandOutcome::Reply(RespValue::Integer(0).encode()));
    }

    let (replica_count, repl_offset) = {
        let server_guard = server.read().await;

        let Some(replicas) = &server_guard.replicas else {
            return Err(CommandError::MasterOnlyCommand("WAIT".to_string()));
        };

        (replicas.len(), server_guard.repl_offset)
    };

    if repl_offset == 0 {
        return Ok(CommandOutcome::Reply(
            RespValue::Integer(replica_count as i64).encode(),
        ));
    }

    let receiver = {
        let mut state_guard = state.lock().await;
        state_guard.arm_wait(wait_arguments.replica_goal as usize)
    };

    replication::broadcast_getack(&server).await;

    let resolved = match wait_arguments.timeout_ms {
        0 => receiver.await.ok(),
        duration => timeout(Duration::from_millis(duration), receiver)
            .await
            .ok()
            .and_then(|received| received.ok()),
    };

    let acked = {
        let mut state_guard = state.lock().await;
        let pending = state_guard.take_wait_count();
        resolved.unwrap_or(pending)
    };

    Ok(CommandOutcome::Reply(
        RespValue::Integer(acked as i64).encode(),
    ))
}
