use std::sync::Arc;

use tokio::sync::Mutex;

use crate::commands::{CommandError, CommandOutcome};
use crate::resp::RespValue;
use crate::store::{DataType, Store, Value};

pub struct IncrArguments {
    key: String,
}

impl IncrArguments {
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        if arguments.len() != 1 {
            return Err(CommandError::WrongNumberOfArguments("incr".to_string()));
        }

        Ok(Self {
            key: arguments[0].clone(),
        })
    }
}

pub async fn incr(
    store: Arc<Mutex<Store>>,
    arguments: &[String],
) -> Result<CommandOutcome, CommandError> {
    let incr_arguments = IncrArguments::parse(arguments)?;

    let mut store_guard = store.lock().await;

    if store_guard
        .get(&incr_arguments.key)
        .is_some_and(|value| value.is_expired())
    {
        store_guard.remove(&incr_arguments.key);
    }

    let Some(value) = store_guard.get_mut(&incr_arguments.key) else {
        store_guard.insert(incr_arguments.key, Value::string("1"));
        return Ok(CommandOutcome::Reply(RespValue::Integer(1).encode()));
    };

    match &mut value.data {
        DataType::String(data) => {
            let current = data
                .parse::<i64>()
                .map_err(|_| CommandError::NotAnInteger)?;
            let incremented = current
                .checked_add(1)
                .ok_or(CommandError::NotAnInteger)?;

            *data = incremented.to_string();

            Ok(CommandOutcome::Reply(
                RespValue::Integer(incremented).encode(),
            ))
        }
        DataType::Stream(_) => Err(CommandError::WrongType),
    }
}
