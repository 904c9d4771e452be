// [libs/domain/commands/src/errors.rs]
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("[COMMAND_VALIDATION]: command_type must not be empty")]
    EmptyCommandType,

    #[error("[COMMAND_VALIDATION]: device_id must not be empty")]
    EmptyDeviceId,
}
