use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::commands::streams::{entries_to_resp, parse_read_id};
use crate::commands::{CommandError, CommandOutcome};
use crate::resp::RespValue;
use crate::state::State;
use crate::store::{DataType, Store, StreamId};

pub struct XreadArguments {
    block_ms: Option<u64>,
    requests: Vec<(String, String)>,
}

impl XreadArguments {
    /// Arguments are `[BLOCK ms] STREAMS key... id...` with as many ids as
    /// keys.
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        let mut cursor = 0;
        let mut block_ms = None;

        if arguments
            .first()
            .is_some_and(|argument| argument.eq_ignore_ascii_case("block"))
        {
            let duration = arguments
                .get(1)
                .ok_or(CommandError::WrongNumberOfArguments("xread".to_string()))?;

            block_ms = Some(
                duration
                    .parse::<u64>()
                    .map_err(|_| CommandError::SyntaxError)?,
            );
            cursor = 2;
        }

        match arguments.get(cursor) {
            Some(argument) if argument.eq_ignore_ascii_case("streams") => (),
            Some(_) => return Err(CommandError::SyntaxError),
            None => return Err(CommandError::WrongNumberOfArguments("xread".to_string())),
        }

        let pairs = &arguments[cursor + 1..];
        if pairs.is_empty() || pairs.len() % 2 != 0 {
            return Err(CommandError::WrongNumberOfArguments("xread".to_string()));
        }

        let key_count = pairs.len() / 2;
        let requests = (0..key_count)
            .map(|index| (pairs[index].clone(), pairs[key_count + index].clone()))
            .collect();

        Ok(Self { block_ms, requests })
    }
}

/// Reads entries newer than the given ids, optionally blocking until a
/// watched stream grows or the timeout fires.
pub async fn xread(
    store: Arc<Mutex<Store>>,
    state: Arc<Mutex<State>>,
    arguments: &[String],
) -> Result<CommandOutcome, CommandError> {
    let xread_arguments = XreadArguments::parse(arguments)?;

    let watched = resolve_watermarks(&store, &xread_arguments.requests).await?;
    let response = read_streams(&store, &watched).await?;

    let Some(block_ms) = xread_arguments.block_ms else {
        return Ok(CommandOutcome::Reply(response.encode()));
    };

    if response != RespValue::Array(Vec::new()) {
        return Ok(CommandOutcome::Reply(response.encode()));
    }

    let receiver = {
        let mut state_guard = state.lock().await;
        state_guard.arm_block(watched.clone())
    };

    // An append may have landed between the read above and arming the
    // watch; a second read closes that window.
    let response = read_streams(&store, &watched).await?;
    if response != RespValue::Array(Vec::new()) {
        let mut state_guard = state.lock().await;
        state_guard.clear_block();
        return Ok(CommandOutcome::Reply(response.encode()));
    }

    let woken = match block_ms {
        0 => receiver.await.ok(),
        duration => timeout(Duration::from_millis(duration), receiver)
            .await
            .ok()
            .and_then(|resolved| resolved.ok()),
    };

    {
        let mut state_guard = state.lock().await;
        state_guard.clear_block();
    }

    match woken {
        // Every watched key is re-read at wake time, so entries appended
        // to a sibling stream while this call slept are not lost.
        Some(()) => {
            let response = read_streams(&store, &watched).await?;
            Ok(CommandOutcome::Reply(response.encode()))
        }
        None => Ok(CommandOutcome::Reply(RespValue::Null.encode())),
    }
}

/// Resolves each request's id argument to the watermark entries must exceed;
/// `$` means the stream's current `last_id` (`0-0` for a stream that does
/// not exist yet).
async fn resolve_watermarks(
    store: &Arc<Mutex<Store>>,
    requests: &[(String, String)],
) -> Result<Vec<(String, StreamId)>, CommandError> {
    let store_guard = store.lock().await;
    let mut watched = Vec::with_capacity(requests.len());

    for (key, raw_id) in requests {
        let watermark = if raw_id == "$" {
            match store_guard.get(key) {
                Some(value) => match &value.data {
                    DataType::Stream(stream) => stream.last_id,
                    DataType::String(_) => return Err(CommandError::WrongType),
                },
                None => StreamId::ZERO,
            }
        } else {
            parse_read_id(raw_id).map_err(CommandError::InvalidStreamId)?
        };

        watched.push((key.clone(), watermark));
    }

    Ok(watched)
}

async fn read_streams(
    store: &Arc<Mutex<Store>>,
    watched: &[(String, StreamId)],
) -> Result<RespValue, CommandError> {
    let store_guard = store.lock().await;
    let mut results = Vec::new();

    for (key, after) in watched {
        let Some(value) = store_guard.get(key) else {
            continue;
        };

        let DataType::Stream(stream) = &value.data else {
            return Err(CommandError::WrongType);
        };

        let newer = stream.entries_after(*after);
        if !newer.is_empty() {
            results.push(RespValue::Array(vec![
                RespValue::BulkString(key.clone()),
                entries_to_resp(&newer),
            ]));
        }
    }

    Ok(RespValue::Array(results))
}
