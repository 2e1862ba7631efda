use thiserror::Error;

use crate::resp::RespValue;
use crate::state::StateError;

#[derive(Error, Debug, PartialEq)]
pub enum CommandError {
    #[error("unknown command {0}")]
    UnknownCommand(String),
    #[error("wrong number of arguments for '{0}' command")]
    WrongNumberOfArguments(String),
    #[error("syntax error")]
    SyntaxError,
    #[error("operation against a key holding the wrong kind of value")]
    WrongType,
    #[error("{0}")]
    InvalidStreamId(String),
    #[error("value is not an integer or out of range")]
    NotAnInteger,
    #[error("EXEC without MULTI")]
    ExecWithoutMulti,
    #[error("DISCARD without MULTI")]
    DiscardWithoutMulti,
    #[error("unknown CONFIG subcommand {0}")]
    UnknownConfigSubcommand(String),
    #[error("{0} can only be used on a master instance")]
    MasterOnlyCommand(String),
    #[error("write command on a read only replica")]
    ReplicaReadOnly,
    #[error("transaction error")]
    Transaction(#[from] StateError),
    #[error("system clock is out of range")]
    ClockOutOfRange,
}

impl CommandError {
    /// The RESP error frame written back to the client.
    pub fn as_string(&self) -> String {
        match self {
            CommandError::UnknownCommand(name) => {
                RespValue::Error(format!("Unknown command: {}", name)).encode()
            }
            CommandError::WrongNumberOfArguments(command) => RespValue::Error(format!(
                "ERR wrong number of arguments for '{}' command",
                command
            ))
            .encode(),
            CommandError::SyntaxError => RespValue::Error("ERR syntax error".to_string()).encode(),
            CommandError::WrongType => RespValue::Error(
                "WRONGTYPE Operation against a key holding the wrong kind of value".to_string(),
            )
            .encode(),
            CommandError::InvalidStreamId(message) => {
                RespValue::Error(format!("ERR {}", message)).encode()
            }
            CommandError::NotAnInteger => {
                RespValue::Error("ERR value is not an integer or out of range".to_string()).encode()
            }
            CommandError::ExecWithoutMulti => {
                RespValue::Error("ERR EXEC without MULTI".to_string()).encode()
            }
            CommandError::DiscardWithoutMulti => {
                RespValue::Error("ERR DISCARD without MULTI".to_string()).encode()
            }
            CommandError::UnknownConfigSubcommand(subcommand) => {
                RespValue::Error(format!("ERR Unknown CONFIG subcommand: {}", subcommand)).encode()
            }
            CommandError::MasterOnlyCommand(command) => RespValue::Error(format!(
                "ERR {} can only be used on a master instance",
                command
            ))
            .encode(),
            CommandError::ReplicaReadOnly => RespValue::Error(
                "READONLY You can't write against a read only replica".to_string(),
            )
            .encode(),
            CommandError::Transaction(error) => {
                RespValue::Error(format!("ERR {}", error)).encode()
            }
            CommandError::ClockOutOfRange => {
                RespValue::Error("ERR system clock is out of range".to_string()).encode()
            }
        }
    }
}
