use std::sync::Arc;

use tokio::sync::Mutex;

use crate::commands::{CommandError, CommandOutcome};
use crate::resp::RespValue;
use crate::store::Store;

pub struct KeysArguments {
    pattern: String,
}

impl KeysArguments {
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        if arguments.len() != 1 {
            return Err(CommandError::WrongNumberOfArguments("keys".to_string()));
        }

        Ok(Self {
            pattern: arguments[0].clone(),
        })
    }
}

/// Only the match-everything pattern is implemented; any other pattern
/// answers with the empty bulk string.
pub async fn keys(
    store: Arc<Mutex<Store>>,
    arguments: &[String],
) -> Result<CommandOutcome, CommandError> {
    let keys_arguments = KeysArguments::parse(arguments)?;

    if keys_arguments.pattern != "*" {
        return Ok(CommandOutcome::Reply(
            RespValue::BulkString(String::new()).encode(),
        ));
    }

    let store_guard = store.lock().await;
    let response = store_guard
        .live_keys()
        .into_iter()
        .map(|key| RespValue::BulkString(key.clone()))
        .collect();

    Ok(CommandOutcome::Reply(RespValue::Array(response).encode()))
}
