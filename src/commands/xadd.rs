use std::sync::Arc;

use jiff::Timestamp;
use tokio::sync::Mutex;

use crate::commands::streams::resolve_entry_id;
use crate::commands::{CommandError, CommandOutcome};
use crate::resp::RespValue;
use crate::state::State;
use crate::store::{DataType, Store, Stream, StreamId, Value};

pub struct XaddArguments {
    key: String,
    entry_id: String,
    fields: Vec<(String, String)>,
}

impl XaddArguments {
    /// Arguments are `key id field value [field value ...]` with at least
    /// one pair and an even number of field/value arguments.
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        if arguments.len() < 4 || arguments[2..].len() % 2 != 0 {
            return Err(CommandError::WrongNumberOfArguments("xadd".to_string()));
        }

        Ok(Self {
            key: arguments[0].clone(),
            entry_id: arguments[1].clone(),
            fields: arguments[2..]
                .chunks(2)
                .map(|pair| (pair[0].clone(), pair[1].clone()))
                .collect(),
        })
    }
}

/// Appends an entry, assigning or validating its id against the stream's
/// `last_id`, and wakes a blocking `XREAD` watching the key.
pub async fn xadd(
    store: Arc<Mutex<Store>>,
    state: Arc<Mutex<State>>,
    arguments: &[String],
) -> Result<CommandOutcome, CommandError> {
    let xadd_arguments = XaddArguments::parse(arguments)?;
    let now_ms = Timestamp::now().as_millisecond().max(0) as u64;

    let accepted_id = {
        let mut store_guard = store.lock().await;

        if store_guard
            .get(&xadd_arguments.key)
            .is_some_and(|value| value.is_expired())
        {
            store_guard.remove(&xadd_arguments.key);
        }

        let last_id = match store_guard.get(&xadd_arguments.key) {
            Some(value) => match &value.data {
                DataType::Stream(stream) => stream.last_id,
                DataType::String(_) => return Err(CommandError::WrongType),
            },
            None => StreamId::ZERO,
        };

        let accepted_id = resolve_entry_id(&xadd_arguments.entry_id, last_id, now_ms)
            .map_err(CommandError::InvalidStreamId)?;

        match store_guard.get_mut(&xadd_arguments.key) {
            Some(value) => {
                let DataType::Stream(stream) = &mut value.data else {
                    return Err(CommandError::WrongType);
                };
                stream.append(accepted_id, xadd_arguments.fields);
            }
            None => {
                let mut stream = Stream::default();
                stream.append(accepted_id, xadd_arguments.fields);
                store_guard.insert(
                    xadd_arguments.key.clone(),
                    Value {
                        data: DataType::Stream(stream),
                        expires_at: None,
                    },
                );
            }
        }

        accepted_id
    };

    let mut state_guard = state.lock().await;
    state_guard.notify_stream_append(&xadd_arguments.key, accepted_id);

    Ok(CommandOutcome::Reply(
        RespValue::BulkString(accepted_id.to_string()).encode(),
    ))
}
