use std::sync::Arc;

use tokio::sync::Mutex;

use crate::commands::streams::{entries_to_resp, parse_range_end, parse_range_start};
use crate::commands::{CommandError, CommandOutcome};
use crate::resp::RespValue;
use crate::store::{DataType, Store, StreamId};

pub struct XrangeArguments {
    key: String,
    start: StreamId,
    end: StreamId,
}

impl XrangeArguments {
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        if arguments.len() != 3 {
            return Err(CommandError::WrongNumberOfArguments("xrange".to_string()));
        }

        let start = parse_range_start(&arguments[1]).map_err(CommandError::InvalidStreamId)?;
        let end = parse_range_end(&arguments[2]).map_err(CommandError::InvalidStreamId)?;

        Ok(Self {
            key: arguments[0].clone(),
            start,
            end,
        })
    }
}

pub async fn xrange(
    store: Arc<Mutex<Store>>,
    arguments: &[String],
) -> Result<CommandOutcome, CommandError> {
    let xrange_arguments = XrangeArguments::parse(arguments)?;

    let store_guard = store.lock().await;

    let Some(value) = store_guard.get(&xrange_arguments.key) else {
        return Ok(CommandOutcome::Reply(RespValue::Array(Vec::new()).encode()));
    };

    let DataType::Stream(stream) = &value.data else {
        return Err(CommandError::WrongType);
    };

    let matching = stream.range(xrange_arguments.start, xrange_arguments.end);

    Ok(CommandOutcome::Reply(entries_to_resp(&matching).encode()))
}
