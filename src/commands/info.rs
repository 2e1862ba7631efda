use std::sync::Arc;

use tokio::sync::RwLock;

use crate::commands::{CommandError, CommandOutcome};
use crate::resp::RespValue;
use crate::server::Server;

pub struct InfoArguments;

impl InfoArguments {
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        if arguments.len() > 1 {
            return Err(CommandError::WrongNumberOfArguments("info".to_string()));
        }

        Ok(Self)
    }
}

/// Only the replication section is reported, whichever section the client
/// asked for.
pub async fn info(
    server: Arc<RwLock<Server>>,
    arguments: &[String],
) -> Result<CommandOutcome, CommandError> {
    InfoArguments::parse(arguments)?;

    let server_guard = server.read().await;
    let body = format!(
        "# Replication\nrole:{}\nmaster_replid:{}\nmaster_repl_offset:{}",
        server_guard.role.as_str(),
        server_guard.repl_id,
        server_guard.repl_offset
    );

    Ok(CommandOutcome::Reply(RespValue::BulkString(body).encode()))
}
