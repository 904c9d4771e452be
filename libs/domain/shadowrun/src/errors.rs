// [libs/domain/shadowrun/src/errors.rs]
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShadowRunError {
    #[error("[SHADOWRUN_ALREADY_RUNNING]: job is already RUNNING")]
    AlreadyRunning,
}
