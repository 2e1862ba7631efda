use crate::commands::{CommandError, CommandOutcome};
use crate::resp::RespValue;

pub struct EchoArguments {
    message: String,
}

impl EchoArguments {
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        if arguments.len() != 1 {
            return Err(CommandError::WrongNumberOfArguments("echo".to_string()));
        }

        Ok(Self {
            message: arguments[0].clone(),
        })
    }
}

pub fn echo(arguments: &[String]) -> Result<CommandOutcome, CommandError> {
    let echo_arguments = EchoArguments::parse(arguments)?;

    Ok(CommandOutcome::Reply(
        RespValue::BulkString(echo_arguments.message).encode(),
    ))
}
