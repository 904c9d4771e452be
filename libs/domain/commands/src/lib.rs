// [libs/domain/commands/src/lib.rs]
//! Command lifecycle (C9): idempotent issue, dispatch, and the
//! ack/fail/timeout state machine.

mod command;
mod errors;
mod idempotency;

pub use command::{apply_rpc_result, is_within_idempotency_window, issue, mark_sent, sweep_timeout, Command, CommandStatus, IssueOutcome, RpcResult};
pub use errors::CommandError;
pub use idempotency::{derive_from_payload, resolve as resolve_idempotency_key};
