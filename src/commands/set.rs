use std::sync::Arc;

use jiff::Timestamp;
use tokio::sync::Mutex;

use crate::commands::{CommandError, CommandOutcome};
use crate::resp::RespValue;
use crate::store::{DataType, Store, Value};

pub struct SetArguments {
    key: String,
    value: String,
    expires_at: Option<Timestamp>,
}

impl SetArguments {
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        if arguments.len() != 2 && arguments.len() != 4 {
            return Err(CommandError::WrongNumberOfArguments("set".to_string()));
        }

        let mut expires_at: Option<Timestamp> = None;

        if arguments.len() == 4 {
            if !arguments[2].eq_ignore_ascii_case("px") {
                return Err(CommandError::SyntaxError);
            }

            let lifetime_ms = arguments[3]
                .parse::<i64>()
                .map_err(|_| CommandError::SyntaxError)?;

            let deadline = Timestamp::now().as_millisecond() + lifetime_ms;
            expires_at = Some(
                Timestamp::from_millisecond(deadline)
                    .map_err(|_| CommandError::ClockOutOfRange)?,
            );
        }

        Ok(Self {
            key: arguments[0].clone(),
            value: arguments[1].clone(),
            expires_at,
        })
    }
}

pub async fn set(
    store: Arc<Mutex<Store>>,
    arguments: &[String],
) -> Result<CommandOutcome, CommandError> {
    let set_arguments = SetArguments::parse(arguments)?;

    let mut store_guard = store.lock().await;
    store_guard.insert(
        set_arguments.key,
        Value {
            data: DataType::String(set_arguments.value),
            expires_at: set_arguments.expires_at,
        },
    );

    Ok(CommandOutcome::Reply(
        RespValue::SimpleString("OK".to_string()).encode(),
    ))
}
