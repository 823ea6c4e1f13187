use thiserror::Error;

/// Top-level error taxonomy. Each class maps to a distinct process exit
/// status so scripts can tell a bad invocation from a failed run.
#[derive(Debug, Error)]
pub enum IdsError {
    /// Missing files, empty interface names, invalid parameters. Not retried.
    #[error("input error: {0}")]
    Input(String),

    /// The capture device could not be opened or the capture died mid-run.
    #[error("capture failed: {0}")]
    Capture(String),

    /// A capture artifact exists but could not be analyzed.
    #[error("analysis failed: {0}")]
    Analysis(String),
}

impl IdsError {
    pub fn exit_code(&self) -> i32 {
        match self {
            IdsError::Input(_) => 2,
            IdsError::Capture(_) | IdsError::Analysis(_) => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, IdsError>;
