use crate::commands::{CommandError, CommandOutcome};
use crate::resp::RespValue;

pub struct PingArguments;

impl PingArguments {
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        if !arguments.is_empty() {
            return Err(CommandError::WrongNumberOfArguments("ping".to_string()));
        }

        Ok(Self)
    }
}

pub fn ping(arguments: &[String]) -> Result<CommandOutcome, CommandError> {
    PingArguments::parse(arguments)?;

    Ok(CommandOutcome::Reply(
        RespValue::SimpleString("PONG".to_string()).encode(),
    ))
}
