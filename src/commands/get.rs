use std::sync::Arc;

use tokio::sync::Mutex;

use crate::commands::{CommandError, CommandOutcome};
use crate::resp::RespValue;
use crate::store::{DataType, Store};

pub struct GetArguments {
    key: String,
}

impl GetArguments {
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        if arguments.len() != 1 {
            return Err(CommandError::WrongNumberOfArguments("get".to_string()));
        }

        Ok(Self {
            key: arguments[0].clone(),
        })
    }
}

pub async fn get(
    store: Arc<Mutex<Store>>,
    arguments: &[String],
) -> Result<CommandOutcome, CommandError> {
    let get_arguments = GetArguments::parse(arguments)?;

    let mut store_guard = store.lock().await;

    let Some(value) = store_guard.get(&get_arguments.key) else {
        return Ok(CommandOutcome::Reply(RespValue::Null.encode()));
    };

    if value.is_expired() {
        store_guard.remove(&get_arguments.key);
        return Ok(CommandOutcome::Reply(RespValue::Null.encode()));
    }

    match &value.data {
        DataType::String(data) => Ok(CommandOutcome::Reply(
            RespValue::BulkString(data.clone()).encode(),
        )),
        DataType::Stream(_) => Err(CommandError::WrongType),
    }
}
