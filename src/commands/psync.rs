use std::sync::Arc;

use tokio::sync::RwLock;

use crate::commands::{CommandError, CommandOutcome};
use crate::server::Server;

pub struct PsyncArguments {
    replication_id: String,
}

impl PsyncArguments {
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        if arguments.len() != 2 {
            return Err(CommandError::WrongNumberOfArguments("psync".to_string()));
        }

        arguments[1]
            .parse::<i64>()
            .map_err(|_| CommandError::SyntaxError)?;

        Ok(Self {
            replication_id: arguments[0].clone(),
        })
    }
}

/// Starts a full resync: the connection layer writes the returned header,
/// follows it with the raw snapshot payload and registers the peer as a
/// replica.
pub async fn psync(
    server: Arc<RwLock<Server>>,
    arguments: &[String],
) -> Result<CommandOutcome, CommandError> {
    let psync_arguments = PsyncArguments::parse(arguments)?;

    let server_guard = server.read().await;

    if server_guard.replicas.is_none() {
        return Err(CommandError::MasterOnlyCommand("PSYNC".to_string()));
    }

    if psync_arguments.replication_id != "?"
        && psync_arguments.replication_id != server_guard.repl_id
    {
        return Err(CommandError::SyntaxError);
    }

    Ok(CommandOutcome::FullResync {
        header: format!(
            "+FULLRESYNC {} {}\r\n",
            server_guard.repl_id, server_guard.repl_offset
        ),
    })
}
