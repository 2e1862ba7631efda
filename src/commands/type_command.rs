use std::sync::Arc;

use tokio::sync::Mutex;

use crate::commands::{CommandError, CommandOutcome};
use crate::resp::RespValue;
use crate::store::{DataType, Store};

pub struct TypeArguments {
    key: String,
}

impl TypeArguments {
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        if arguments.len() != 1 {
            return Err(CommandError::WrongNumberOfArguments("type".to_string()));
        }

        Ok(Self {
            key: arguments[0].clone(),
        })
    }
}

pub async fn type_command(
    store: Arc<Mutex<Store>>,
    arguments: &[String],
) -> Result<CommandOutcome, CommandError> {
    let type_arguments = TypeArguments::parse(arguments)?;

    let store_guard = store.lock().await;

    let name = match store_guard.get(&type_arguments.key) {
        Some(value) if !value.is_expired() => match value.data {
            DataType::String(_) => "string",
            DataType::Stream(_) => "stream",
        },
        _ => "none",
    };

    Ok(CommandOutcome::Reply(
        RespValue::SimpleString(name.to_string()).encode(),
    ))
}
