use std::sync::Arc;

use tokio::sync::RwLock;

use crate::commands::{CommandError, CommandOutcome};
use crate::resp::RespValue;
use crate::server::Server;

pub struct ConfigArguments {
    parameter: String,
}

impl ConfigArguments {
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        let Some(subcommand) = arguments.first() else {
            return Err(CommandError::WrongNumberOfArguments("config".to_string()));
        };

        if !subcommand.eq_ignore_ascii_case("get") {
            return Err(CommandError::UnknownConfigSubcommand(subcommand.clone()));
        }

        if arguments.len() != 2 {
            return Err(CommandError::WrongNumberOfArguments(
                "config|get".to_string(),
            ));
        }

        Ok(Self {
            parameter: arguments[1].clone(),
        })
    }
}

/// `CONFIG GET` answers `dir` and `dbfilename` as a `[name, value]` pair;
/// every other parameter yields an empty array.
pub async fn config(
    server: Arc<RwLock<Server>>,
    arguments: &[String],
) -> Result<CommandOutcome, CommandError> {
    let config_arguments = ConfigArguments::parse(arguments)?;

    let server_guard = server.read().await;

    let value = match config_arguments.parameter.as_str() {
        "dir" => Some(server_guard.dir.clone()),
        "dbfilename" => Some(server_guard.dbfilename.clone()),
        _ => None,
    };

    let response = match value {
        Some(value) => RespValue::Array(vec![
            RespValue::BulkString(config_arguments.parameter),
            RespValue::BulkString(value),
        ]),
        None => RespValue::Array(Vec::new()),
    };

    Ok(CommandOutcome::Reply(response.encode()))
}
