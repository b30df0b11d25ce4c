/// Errors raised while evaluating a title's run state.
#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    #[error("process {pid} not found")]
    ProcessLookup { pid: u32 },

    #[error("failed to read launcher log: {0}")]
    LogRead(String),
}
